//! Semantic checks on parsed assertions and responses.
//!
//! Validators never fail; they record human readable errors in a
//! [`Result`] so callers can report every problem at once.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::assertion::{Assertion, SubjectConfirmation};
use crate::protocol::Response;

/// Allowed clock skew between IdP and SP, in seconds.
pub const ALLOWED_CLOCK_SKEW_SECS: i64 = 60;

fn allowed_clock_skew() -> Duration {
    Duration::seconds(ALLOWED_CLOCK_SKEW_SECS)
}

/// Source of the current time.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Errors collected while validating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Result {
    errors: Vec<String>,
}

impl Result {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

pub trait AssertionConstraintValidator {
    fn validate(&self, assertion: &Assertion, result: &mut Result);
}

pub trait SubjectConfirmationConstraintValidator {
    fn validate(&self, subject_confirmation: &SubjectConfirmation, result: &mut Result);
}

pub trait ResponseConstraintValidator {
    fn validate(&self, response: &Response, result: &mut Result);
}

/// Rejects assertions whose `NotOnOrAfter` lies more than the allowed skew in the past.
pub struct NotOnOrAfter<C = SystemClock> {
    clock: C,
}

impl Default for NotOnOrAfter {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> NotOnOrAfter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> AssertionConstraintValidator for NotOnOrAfter<C> {
    fn validate(&self, assertion: &Assertion, result: &mut Result) {
        if let Some(not_on_or_after) = assertion.not_on_or_after() {
            if not_on_or_after <= self.clock.now() - allowed_clock_skew() {
                result.add_error(
                    "Received an assertion that has expired. Check clock synchronization on IdP and SP.",
                );
            }
        }
    }
}

/// Rejects assertions whose `NotBefore` lies more than the allowed skew in the future.
pub struct NotBefore<C = SystemClock> {
    clock: C,
}

impl Default for NotBefore {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> NotBefore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> AssertionConstraintValidator for NotBefore<C> {
    fn validate(&self, assertion: &Assertion, result: &mut Result) {
        if let Some(not_before) = assertion.not_before() {
            if not_before > self.clock.now() + allowed_clock_skew() {
                result.add_error(
                    "Received an assertion that is valid in the future. Check clock synchronization on IdP and SP.",
                );
            }
        }
    }
}

/// The `InResponseTo` of a confirmation must match that of its response when both are set.
pub struct SubjectConfirmationResponseToMatches {
    in_response_to: Option<String>,
}

impl SubjectConfirmationResponseToMatches {
    pub fn new(response: &Response) -> Self {
        Self {
            in_response_to: response.in_response_to().map(str::to_string),
        }
    }
}

impl SubjectConfirmationConstraintValidator for SubjectConfirmationResponseToMatches {
    fn validate(&self, subject_confirmation: &SubjectConfirmation, result: &mut Result) {
        let confirmation = subject_confirmation
            .data
            .as_ref()
            .and_then(|d| d.in_response_to.as_deref());
        if let (Some(expected), Some(actual)) = (self.in_response_to.as_deref(), confirmation) {
            if expected != actual {
                result.add_error(format!(
                    "InResponseTo in SubjectConfirmationData (\"{actual}\") does not match the Response InResponseTo (\"{expected}\")"
                ));
            }
        }
    }
}

/// The response status must be Success.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsSuccessful;

impl ResponseConstraintValidator for IsSuccessful {
    fn validate(&self, response: &Response, result: &mut Result) {
        if !response.is_success() {
            result.add_error(response.status().describe());
        }
    }
}

/// Runs a set of assertion validators.
#[derive(Default)]
pub struct AssertionValidator {
    validators: Vec<Box<dyn AssertionConstraintValidator>>,
}

impl AssertionValidator {
    /// The time window checks against the system clock.
    pub fn with_defaults() -> Self {
        let mut validator = Self::default();
        validator.add(NotBefore::default());
        validator.add(NotOnOrAfter::default());
        validator
    }

    pub fn add(&mut self, validator: impl AssertionConstraintValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    pub fn validate(&self, assertion: &Assertion) -> Result {
        let mut result = Result::new();
        for validator in &self.validators {
            validator.validate(assertion, &mut result);
        }
        debug!(id = assertion.id(), valid = result.is_valid(), "Validated assertion");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::SubjectConfirmationData;
    use crate::constants::{CM_BEARER, STATUS_PREFIX};
    use crate::protocol::Status;
    use chrono::TimeZone;

    fn clock_at(now: DateTime<Utc>) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);
        clock
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn expiring_at(ts: DateTime<Utc>) -> Assertion {
        let mut assertion = Assertion::new();
        assertion.set_not_on_or_after(Some(ts));
        assertion
    }

    #[test]
    fn test_not_on_or_after_grace_period() {
        let validator = NotOnOrAfter::with_clock(clock_at(now()));

        let mut result = Result::new();
        validator.validate(&expiring_at(now() - Duration::seconds(60)), &mut result);
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);

        for ts in [now() - Duration::seconds(59), now()] {
            let mut result = Result::new();
            validator.validate(&expiring_at(ts), &mut result);
            assert!(result.is_valid());
        }
    }

    #[test]
    fn test_not_before_grace_period() {
        let validator = NotBefore::with_clock(clock_at(now()));

        let mut assertion = Assertion::new();
        assertion.set_not_before(Some(now() + Duration::seconds(61)));
        let mut result = Result::new();
        validator.validate(&assertion, &mut result);
        assert!(!result.is_valid());

        assertion.set_not_before(Some(now() + Duration::seconds(60)));
        let mut result = Result::new();
        validator.validate(&assertion, &mut result);
        assert!(result.is_valid());
    }

    fn confirmation(in_response_to: Option<&str>) -> SubjectConfirmation {
        let mut sc = SubjectConfirmation::new(CM_BEARER);
        sc.data = Some(SubjectConfirmationData {
            in_response_to: in_response_to.map(str::to_string),
            ..SubjectConfirmationData::default()
        });
        sc
    }

    fn response_to(in_response_to: Option<&str>) -> Response {
        let mut response = Response::new();
        response.set_in_response_to(in_response_to.map(str::to_string));
        response
    }

    #[test]
    fn test_subject_confirmation_response_to() {
        let cases = [
            (None, Some("someValue"), true),
            (Some("someValue"), None, true),
            (None, None, true),
            (Some("theSameValue"), Some("theSameValue"), true),
            (Some("someValue"), Some("anotherValue"), false),
        ];
        for (response, sc, valid) in cases {
            let validator = SubjectConfirmationResponseToMatches::new(&response_to(response));
            let mut result = Result::new();
            validator.validate(&confirmation(sc), &mut result);
            assert_eq!(result.is_valid(), valid, "{response:?} vs {sc:?}");
        }
    }

    #[test]
    fn test_is_successful() {
        let mut result = Result::new();
        IsSuccessful.validate(&Response::new(), &mut result);
        assert!(result.is_valid());

        let mut response = Response::new();
        response.set_status(Status {
            code: "foo".into(),
            sub_code: Some(format!("{STATUS_PREFIX}bar")),
            message: Some("this is a test message".into()),
        });
        let mut result = Result::new();
        IsSuccessful.validate(&response, &mut result);
        assert_eq!(result.errors(), ["foo/bar this is a test message"]);
    }

    #[test]
    fn test_assertion_validator_collects_errors() {
        let mut validator = AssertionValidator::default();
        validator.add(NotBefore::with_clock(clock_at(now())));
        validator.add(NotOnOrAfter::with_clock(clock_at(now())));

        let mut assertion = Assertion::new();
        assertion.set_not_before(Some(now() + Duration::hours(1)));
        assertion.set_not_on_or_after(Some(now() - Duration::hours(1)));
        assert_eq!(validator.validate(&assertion).errors().len(), 2);
    }
}
