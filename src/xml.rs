//! Safe XML loading, an owned DOM and exclusive canonicalization.

mod c14n;
mod dom;
mod loader;
pub mod ns;

pub use c14n::{C14nOptions, EXCLUSIVE_C14N, EXCLUSIVE_C14N_WITH_COMMENTS, canonicalize};
pub use dom::{Attribute, Document, Element, Node};
pub use loader::{from_file, from_string};

pub(crate) use dom::set_xsi_type;
