//! qBittorrent application preferences document

use serde_json::{Map, Value};

use crate::error::{Result, TorrentError};

/// Preference key holding the incoming peer connection port
pub const LISTEN_PORT_KEY: &str = "listen_port";

/// Preferences as returned by `/api/v2/app/preferences`
///
/// The document is kept opaque: only the listening port is ever read or
/// written, every other key is sent back exactly as it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences(Map<String, Value>);

impl Preferences {
    /// Parse a preferences body. Anything other than a JSON object is rejected.
    pub fn from_body(body: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(TorrentError::Malformed(format!(
                "preferences is not an object: {}",
                other
            ))),
            Err(e) => Err(TorrentError::Malformed(format!(
                "preferences is not JSON: {}",
                e
            ))),
        }
    }

    /// Current listening port, if present and in range
    pub fn listen_port(&self) -> Option<u16> {
        self.0
            .get(LISTEN_PORT_KEY)
            .and_then(Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
    }

    pub fn set_listen_port(&mut self, port: u16) {
        self.0.insert(LISTEN_PORT_KEY.to_string(), Value::from(port));
    }

    /// Serialize the whole document for `setPreferences`
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}
