use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identity of an upstream AI service.
///
/// Used as the health-tracking key and for explicit routing. The three
/// built-in identities map onto the roles the dispatcher knows about; any
/// other adapter registers under `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderId {
    /// Default hosted provider, served with server-side credentials
    Hosted,
    /// Provider used when the caller brings its own API key
    CustomKey,
    /// Free, lower-capability backup provider
    Backup,
    /// Any additional adapter
    Custom(String),
}

impl ProviderId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hosted => "default-hosted",
            Self::CustomKey => "custom-key",
            Self::Backup => "backup-free",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "default-hosted" | "hosted" | "gemini" => Self::Hosted,
            "custom-key" | "custom" => Self::CustomKey,
            "backup-free" | "backup" | "pollinations" => Self::Backup,
            _ => Self::Custom(s.trim().to_string()),
        })
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        value.as_str().to_string()
    }
}
