use serde::{Deserialize, Serialize};

/// Body posted to the external token validation endpoint
#[derive(Serialize)]
pub struct AuthRequest<'a> {
    pub token: &'a str,
}

#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub ok: bool,
}
