use crate::Error;
use reqwest::{Response, StatusCode};

/// Trait for converting a 404 error into an `Option<Response>`.
///
/// The beacon node answers `404` when no block exists at the requested slot, which is an
/// expected outcome for the watcher rather than a failure.
pub trait ResponseOptional {
    fn optional(self) -> Result<Option<Response>, Error>;
}

impl ResponseOptional for Result<Response, Error> {
    fn optional(self) -> Result<Option<Response>, Error> {
        match self {
            Ok(x) => Ok(Some(x)),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
