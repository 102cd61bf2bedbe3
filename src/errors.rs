use failure::{Context, Error as FailureError};
use hyper::StatusCode;
use serde_json;
use validator::ValidationErrors;

/// Error kinds attached as context to `failure::Error` chains across the app.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Not found")]
    NotFound,
    #[fail(display = "Parse error")]
    Parse,
    #[fail(display = "Validation error: {}", _0)]
    Validate(ValidationErrors),
    #[fail(display = "Coupon has already been redeemed")]
    AlreadyRedeemed,
    #[fail(display = "Coupon status can not change from {} to {}", from, to)]
    InvalidTransition { from: String, to: String },
    #[fail(display = "Unable to generate unique code after {} attempts", _0)]
    GenerationExhausted(usize),
    #[fail(display = "Ledger row was changed by another request")]
    Conflict,
    #[fail(display = "Ledger is unavailable")]
    CollaboratorUnavailable,
}

/// Maps an error to the http status it is answered with.
pub trait Codeable {
    fn code(&self) -> StatusCode;
}

impl Codeable for Error {
    fn code(&self) -> StatusCode {
        match *self {
            Error::NotFound => StatusCode::NotFound,
            Error::Parse => StatusCode::UnprocessableEntity,
            Error::Validate(_) | Error::InvalidTransition { .. } => StatusCode::BadRequest,
            Error::AlreadyRedeemed | Error::Conflict => StatusCode::Conflict,
            Error::GenerationExhausted(_) => StatusCode::InternalServerError,
            Error::CollaboratorUnavailable => StatusCode::ServiceUnavailable,
        }
    }
}

impl Error {
    /// Message safe to show to a client of the http api.
    pub fn message(&self) -> String {
        match *self {
            Error::Validate(ref errors) => serde_json::to_string(errors).unwrap_or_else(|_| "Bad request".to_string()),
            ref other => other.to_string(),
        }
    }
}

/// First `Error` kind found walking down the cause chain of `err`.
/// Kinds are attached with `.context(Error::X)`, so they sit in the chain as `Context<Error>`.
pub fn kind_of(err: &FailureError) -> Option<&Error> {
    err.iter_chain()
        .filter_map(|cause| cause.downcast_ref::<Context<Error>>())
        .map(|context| context.get_context())
        .next()
}

pub fn is_conflict(err: &FailureError) -> bool {
    match kind_of(err) {
        Some(Error::Conflict) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_found_under_outer_context() {
        let err: FailureError = format_err!("Row 3 is gone").context(Error::NotFound).into();
        let err: FailureError = err.context("Service Coupons, delete endpoint error occurred.").into();
        match kind_of(&err) {
            Some(Error::NotFound) => (),
            other => panic!("unexpected error kind {:?}", other),
        }
        assert_eq!(kind_of(&err).map(Codeable::code), Some(StatusCode::NotFound));
    }

    #[test]
    fn test_kind_is_found_directly_under_context() {
        let err: FailureError = format_err!("Coupon AAAAAAAA was redeemed").context(Error::AlreadyRedeemed).into();
        match kind_of(&err) {
            Some(Error::AlreadyRedeemed) => (),
            other => panic!("unexpected error kind {:?}", other),
        }
        assert!(!is_conflict(&err));

        let err: FailureError = format_err!("Row 2 changed").context(Error::Conflict).into();
        assert!(is_conflict(&err));
    }

    #[test]
    fn test_plain_error_has_no_kind() {
        let err = format_err!("boom");
        assert!(kind_of(&err).is_none());
    }
}
