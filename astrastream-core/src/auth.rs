//! Client token validation.
//!
//! Authentication marks a connection but gates nothing: unauthenticated
//! clients can still subscribe and receive broadcasts.

use reqwest::Client;
use std::time::Duration;

use crate::models::auth::{AuthRequest, AuthResponse};

const API_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default)]
pub enum TokenValidator {
    /// Accepts any non-empty token. Stand-in, not a security boundary.
    #[default]
    Permissive,
    /// Delegates to an external endpoint that answers `{"ok": bool}`.
    Remote { http_client: Client, endpoint: String },
}

impl TokenValidator {
    pub fn remote(endpoint: impl Into<String>) -> Self {
        Self::Remote {
            http_client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        match self {
            TokenValidator::Permissive => true,
            TokenValidator::Remote {
                http_client,
                endpoint,
            } => {
                let response = http_client
                    .post(endpoint)
                    .json(&AuthRequest { token })
                    .timeout(API_TIMEOUT)
                    .send()
                    .await;

                match response {
                    Ok(resp) if resp.status().is_success() => {
                        match resp.json::<AuthResponse>().await {
                            Ok(auth) => auth.ok,
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to parse auth response");
                                false
                            }
                        }
                    }
                    Ok(resp) => {
                        tracing::debug!(status = %resp.status(), "auth endpoint rejected token");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "auth endpoint unreachable");
                        false
                    }
                }
            }
        }
    }
}
