use crate::gateway::error::{GatewayError, GatewayResult};
use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

/// HTTP client for the payment gateway with Basic auth and retry
///
/// The gateway authenticates with `Basic base64(server_key + ":")` on
/// every call. Rate limits and server errors are retried with exponential
/// backoff; auth and client errors are surfaced immediately.
#[derive(Clone)]
pub struct GatewayHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    auth_header: String,
}

impl GatewayHttpClient {
    pub fn new(server_key: &str, timeout: Duration, max_retries: u32) -> GatewayResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| GatewayError::Network {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", server_key));

        Ok(Self {
            client,
            timeout,
            max_retries,
            auth_header: format!("Basic {}", credentials),
        })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&JsonValue>,
    ) -> GatewayResult<T> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            let mut request = self
                .client
                .request(method.clone(), url)
                .timeout(self.timeout)
                .header("Authorization", &self.auth_header)
                .header("Accept", "application/json");

            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request.send().await.map_err(|e| GatewayError::Network {
                message: format!("gateway request failed: {}", e),
            });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            GatewayError::Serialization {
                                message: format!("invalid gateway JSON response: {}", e),
                            }
                        });
                    }

                    if status.as_u16() == 401 {
                        return Err(GatewayError::AuthenticationFailed {
                            message: extract_error_message(&text),
                        });
                    }

                    if status.as_u16() == 429 {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                            continue;
                        }
                        return Err(GatewayError::RateLimited {
                            message: "gateway rate limit exceeded".to_string(),
                        });
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    return Err(GatewayError::Upstream {
                        status: status.as_u16(),
                        message: extract_error_message(&text),
                        retryable: status.is_server_error(),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(GatewayError::Network {
            message: "gateway request failed".to_string(),
        }))
    }
}

/// Pull a readable message out of a gateway error body
///
/// The gateway answers with either `{"error_messages": [..]}` or
/// `{"status_message": ".."}` depending on the endpoint.
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<JsonValue>(body) {
        if let Some(messages) = value.get("error_messages").and_then(|m| m.as_array()) {
            let joined: Vec<&str> = messages.iter().filter_map(|m| m.as_str()).collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
        if let Some(message) = value.get("status_message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        "gateway returned an empty error body".to_string()
    } else {
        body.trim().to_string()
    }
}

/// Constant-time byte comparison for signature checks
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn extracts_error_messages_array() {
        let body = r#"{"error_messages": ["transaction_details.gross_amount is required"]}"#;
        assert_eq!(
            extract_error_message(body),
            "transaction_details.gross_amount is required"
        );
    }

    #[test]
    fn extracts_status_message() {
        let body = r#"{"status_code": "404", "status_message": "Transaction doesn't exist."}"#;
        assert_eq!(extract_error_message(body), "Transaction doesn't exist.");
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
        assert!(extract_error_message("").contains("empty"));
    }
}
