//! Request validation for HTTP endpoints.
//!
//! The request bodies themselves are the library's parameter types; this
//! module only turns their validation failures into problem details.

use samudra_lib::{RepositionParameters, RouteParameters};

use crate::{from_lib_error, ProblemDetails};

/// Validation trait for request types.
///
/// The `request_id` populates the `instance` field of any returned
/// `ProblemDetails`, which is boxed to keep `Result::Err` small.
pub trait Validate {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>>;
}

impl Validate for RouteParameters {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        self.to_request()
            .map(|_| ())
            .map_err(|err| Box::new(from_lib_error(&err, request_id)))
    }
}

impl Validate for RepositionParameters {
    fn validate(&self, request_id: &str) -> Result<(), Box<ProblemDetails>> {
        self.to_request()
            .map(|_| ())
            .map_err(|err| Box::new(from_lib_error(&err, request_id)))
    }
}
