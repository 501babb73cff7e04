use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope shared by every non-admin route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error_field() {
        let body = serde_json::to_value(ApiResponse::success(MessageData::new("ok"))).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["message"], "ok");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn failure_omits_data_field() {
        let body = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nope");
        assert!(body.get("data").is_none());
    }
}
