//! Identifier newtypes for players and teams.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque player identifier as issued by the stats provider.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a new PlayerId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Team abbreviation (e.g. "BOS"), always stored uppercase.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TeamCode(String);

impl TeamCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TeamCode({})", self.0)
    }
}

impl From<String> for TeamCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TeamCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<TeamCode> for String {
    fn from(code: TeamCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_display() {
        let id = PlayerId::new("1628369");
        assert_eq!(format!("{}", id), "1628369");
    }

    #[test]
    fn test_player_id_debug() {
        let id = PlayerId::from("203999");
        let debug_str = format!("{:?}", id);
        assert!(debug_str.contains("203999"));
    }

    #[test]
    fn test_player_id_serialization() {
        let id = PlayerId::from("1629029");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1629029\"");

        let parsed: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_team_code_normalizes_case() {
        assert_eq!(TeamCode::new(" bos ").as_str(), "BOS");
        assert_eq!(TeamCode::from("okc"), TeamCode::from("OKC"));
    }

    #[test]
    fn test_team_code_deserialization_normalizes() {
        let code: TeamCode = serde_json::from_str("\"gsw\"").unwrap();
        assert_eq!(code.as_str(), "GSW");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"GSW\"");
    }
}
