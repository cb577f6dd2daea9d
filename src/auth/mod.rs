use crate::config::Secrets;
use axum::http::HeaderMap;
use tracing::debug;


/// Extract bearer token from HTTP headers
///
/// Expected format: "Authorization: Bearer <token>". Camera firmware sends
/// the same value in an "Authentication" header, which is accepted as a
/// fallback.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("authentication"))
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Parse bearer token from an Authorization header value
fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    // Expect "Bearer <token>"
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(TokenError::InvalidFormat);
    }

    if parts[0].to_lowercase() != "bearer" {
        return Err(TokenError::InvalidFormat);
    }

    let token = parts[1].trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}

/// Compare a presented secret against the configured one.
///
/// An unconfigured secret matches nothing. The comparison time does not
/// depend on where the first differing byte is.
pub fn secret_matches(expected: Option<&str>, presented: &str) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Token extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    /// Authorization header or token field not present
    Missing,
    /// Invalid format (not "Bearer <token>")
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "Authorization token not provided"),
            TokenError::InvalidFormat => write!(f, "Invalid authorization token format"),
            TokenError::Empty => write!(f, "Authorization token is empty"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Slash-command request verification (shared token + workspace id)
#[derive(Debug, Clone, Default)]
pub struct ChatVerifier {
    token: Option<String>,
    team_id: Option<String>,
}

impl ChatVerifier {
    pub fn new(token: Option<String>, team_id: Option<String>) -> Self {
        Self { token, team_id }
    }

    pub fn from_secrets(secrets: &Secrets) -> Self {
        Self::new(
            secrets.slack_verification_token.clone(),
            secrets.slack_team_id.clone(),
        )
    }

    pub fn verify(&self, token: &str, team_id: &str) -> bool {
        let token_ok = secret_matches(self.token.as_deref(), token);
        let team_ok = self.team_id.as_deref() == Some(team_id);
        if !(token_ok && team_ok) {
            debug!(token_ok, team_ok, "Chat request verification failed");
        }
        token_ok && team_ok
    }
}

/// Per-class device tokens; yields a "device may act" decision per request
#[derive(Debug, Clone, Default)]
pub struct DeviceAuth {
    door: Option<String>,
    camera: Option<String>,
    camera_power: Option<String>,
}

impl DeviceAuth {
    pub fn new(door: Option<String>, camera: Option<String>, camera_power: Option<String>) -> Self {
        Self {
            door,
            camera,
            camera_power,
        }
    }

    pub fn from_secrets(secrets: &Secrets) -> Self {
        Self::new(
            secrets.acs_token.clone(),
            secrets.camera_token.clone(),
            secrets.camctl_token.clone(),
        )
    }

    /// Door controllers put their token in the JSON body
    pub fn door_allowed(&self, token: Option<&str>) -> bool {
        token.is_some_and(|t| secret_matches(self.door.as_deref(), t))
    }

    pub fn camera_allowed(&self, headers: &HeaderMap) -> bool {
        bearer_matches(headers, self.camera.as_deref())
    }

    pub fn camera_power_allowed(&self, headers: &HeaderMap) -> bool {
        bearer_matches(headers, self.camera_power.as_deref())
    }
}

fn bearer_matches(headers: &HeaderMap, expected: Option<&str>) -> bool {
    match extract_bearer_token(headers) {
        Ok(token) => secret_matches(expected, &token),
        Err(e) => {
            debug!(error = %e, "Device bearer token rejected");
            false
        }
    }
}
