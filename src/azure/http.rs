//! HTTP utilities for Azure Resource Manager REST calls

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub const USER_AGENT: &str = concat!("lals/", env!("CARGO_PKG_VERSION"));

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header ARM echoes back so a request can be traced on the service side
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Failure of a single ARM request
#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed object does not exist (HTTP 404)
    #[error("not found")]
    NotFound,

    /// Any other non-success status, decoded from the ARM error envelope
    #[error("{status} {}: {message}", code.as_deref().unwrap_or("UnknownError"))]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not what we expected
    #[error("decoding response: {0}")]
    Decode(String),

    /// No usable bearer token
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Map a non-success status and its body onto an [`ApiError`]
fn classify(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Status {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| status.to_string()),
        },
        Err(_) => ApiError::Status {
            status: status.as_u16(),
            code: None,
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        },
    }
}

/// HTTP client wrapper for ARM calls
#[derive(Clone, Debug)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    /// Make a GET request, returning the decoded JSON body
    pub async fn get(&self, url: &str, token: &str) -> Result<Value, ApiError> {
        let body = self.send(Method::GET, url, token, None).await?;
        parse_body(&body)?.ok_or_else(|| ApiError::Decode("empty response body".to_string()))
    }

    /// Make a PUT request with a JSON body, returning the decoded JSON body
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<Value, ApiError> {
        let response_body = self.send(Method::PUT, url, token, Some(body)).await?;
        Ok(parse_body(&response_body)?.unwrap_or(Value::Null))
    }

    /// Make a DELETE request; `None` when the service returned no body
    pub async fn delete(&self, url: &str, token: &str) -> Result<Option<Value>, ApiError> {
        let body = self.send(Method::DELETE, url, token, None).await?;
        parse_body(&body)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        let request_id = Uuid::new_v4();
        tracing::debug!("{} {} [{}]", method, url, request_id);

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .header(CLIENT_REQUEST_ID_HEADER, request_id.to_string());

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("reading response body: {}", e)))?;

        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                tracing::debug!("{} {} [{}] -> 404", method, url, request_id);
            } else {
                // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
                tracing::error!(
                    "API error: {} [{}] - {}",
                    status,
                    request_id,
                    sanitize_for_log(&text)
                );
            }
            return Err(classify(status, &text));
        }

        Ok(text)
    }
}

fn parse_body(body: &str) -> Result<Option<Value>, ApiError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Format an ARM error for display
/// Security: Avoids echoing raw service messages for auth failures
pub fn format_arm_error(error: &ApiError) -> String {
    match error {
        ApiError::NotFound => "Resource not found.".to_string(),
        ApiError::Status { status: 401, .. } | ApiError::Auth(_) => {
            "Authentication failed. Check ARM_ACCESS_TOKEN or the service principal settings."
                .to_string()
        }
        ApiError::Status { status: 403, .. } => {
            "Permission denied. Check the role assignments of the calling identity.".to_string()
        }
        ApiError::Status { status: 409, .. } => {
            "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        ApiError::Status { status: 429, .. } => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        ApiError::Status { status, message, .. } if *status >= 500 => {
            format!("Azure service error ({}): {}", status, sanitize_for_log(message))
        }
        ApiError::Status { status, code, message } => format!(
            "Request failed ({} {}): {}",
            status,
            code.as_deref().unwrap_or("UnknownError"),
            sanitize_for_log(message)
        ),
        ApiError::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        ApiError::Decode(msg) => format!("Unexpected response from Azure: {}", sanitize_for_log(msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_404_is_not_found() {
        assert!(classify(StatusCode::NOT_FOUND, "").is_not_found());
    }

    #[test]
    fn test_classify_decodes_error_envelope() {
        let body = r#"{"error":{"code":"InvalidParameter","message":"bad resourceId"}}"#;
        match classify(StatusCode::BAD_REQUEST, body) {
            ApiError::Status {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("InvalidParameter"));
                assert_eq!(message, "bad resourceId");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_tolerates_non_json_body() {
        match classify(StatusCode::BAD_GATEWAY, "<html>oops</html>") {
            ApiError::Status { status, code, .. } => {
                assert_eq!(status, 502);
                assert!(code.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
        assert!(sanitized.len() < body.len());
    }

    #[test]
    fn test_parse_body_empty_is_none() {
        assert!(parse_body("  ").unwrap().is_none());
        assert!(parse_body("{\"a\":1}").unwrap().is_some());
        assert!(matches!(parse_body("{"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_format_arm_error_hides_auth_details() {
        let err = ApiError::Status {
            status: 401,
            code: Some("InvalidAuthenticationToken".to_string()),
            message: "token xyz expired".to_string(),
        };
        let shown = format_arm_error(&err);
        assert!(shown.starts_with("Authentication failed"));
        assert!(!shown.contains("xyz"));
    }
}
