//! Authentication for the Gluetun control server

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// How requests to Gluetun authenticate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GluetunAuth {
    #[default]
    None,
    Basic { username: String, password: String },
    ApiKey(String),
}

impl GluetunAuth {
    /// Build the auth mode from its configuration values
    ///
    /// `method` is matched case-insensitively against `none`, `basic` and
    /// `apikey`. An unknown method, or a known one missing its credentials,
    /// logs a warning and yields [`GluetunAuth::None`].
    pub fn from_settings(method: &str, username: &str, password: &str, api_key: &str) -> Self {
        match method.trim().to_lowercase().as_str() {
            "" | "none" => GluetunAuth::None,
            "basic" => {
                if username.is_empty() || password.is_empty() {
                    tracing::warn!("Gluetun basic auth configured without username/password");
                    return GluetunAuth::None;
                }
                GluetunAuth::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "apikey" => {
                if api_key.is_empty() {
                    tracing::warn!("Gluetun API key auth configured without apikey");
                    return GluetunAuth::None;
                }
                GluetunAuth::ApiKey(api_key.to_string())
            }
            other => {
                tracing::warn!("Unknown Gluetun auth method \"{}\", falling back to none", other);
                GluetunAuth::None
            }
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            GluetunAuth::None => "none",
            GluetunAuth::Basic { .. } => "basic",
            GluetunAuth::ApiKey(_) => "apikey",
        }
    }

    /// Headers to attach to every Gluetun request
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            GluetunAuth::None => {}
            GluetunAuth::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                insert_sensitive(&mut headers, AUTHORIZATION, &format!("Basic {}", encoded));
            }
            GluetunAuth::ApiKey(key) => insert_sensitive(&mut headers, API_KEY_HEADER, key),
        }
        headers
    }
}

fn insert_sensitive(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(
            "Gluetun credentials contain invalid header characters, sending no {}",
            name
        ),
    }
}
