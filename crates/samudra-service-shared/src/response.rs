//! Response wrapper for successful HTTP responses.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Successful payload plus a `content_type` field, mirroring `ProblemDetails`.
///
/// # Example
///
/// ```
/// use samudra_service_shared::ServiceResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Ack {
///     message: String,
/// }
///
/// let response = ServiceResponse::new(Ack { message: "done".into() });
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    #[serde(flatten)]
    pub data: T,

    pub content_type: String,
}

impl<T> ServiceResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            content_type: "application/json".to_string(),
        }
    }
}

impl<T> From<T> for ServiceResponse<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samudra_lib::pipeline::Acknowledgement;

    #[test]
    fn test_payload_fields_are_flattened() {
        let response = ServiceResponse::new(Acknowledgement {
            message: "Route position calculation completed successfully".to_string(),
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json["message"],
            "Route position calculation completed successfully"
        );
        assert_eq!(json["content_type"], "application/json");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_response_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Ack {
            message: String,
        }
        let json = r#"{"message":"ok","content_type":"application/json"}"#;
        let response: ServiceResponse<Ack> = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.message, "ok");
    }
}
