//! `samlp` protocol messages.

mod logout_request;
mod message;
mod response;
mod status;

pub use logout_request::LogoutRequest;
pub use message::MessageHeader;
pub use response::Response;
pub use status::Status;
