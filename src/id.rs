use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Backend-assigned user identifier
///
/// Always a string on the wire, so plain transparent serde is enough here.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId {
    value: CompactString,
}

/// Backend-assigned message identifier
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId {
    value: CompactString,
}

impl UserId {
    pub fn new<S: Into<CompactString>>(id: S) -> Self {
        Self { value: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl MessageId {
    pub fn new<S: Into<CompactString>>(id: S) -> Self {
        Self { value: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.pad(&self.value)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.pad(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_format_with_width() {
        assert_eq!(format!("{:<6}|", UserId::new("u1")), "u1    |");
        assert_eq!(format!("{:>6}", MessageId::new("m1")), "    m1");
    }
}
