//! SignalId - Cheap-to-clone label for a registered signal
//!
//! Uses `Arc<str>` so the sampling thread can tag metrics without allocating.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Signal label, e.g. `"front_left/drive"` or `"gyro/yaw"`.
///
/// # Examples
/// ```
/// use contracts::SignalId;
///
/// let id = SignalId::scoped("front_left", "drive");
/// assert_eq!(id, "front_left/drive");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SignalId(Arc<str>);

impl SignalId {
    /// Create a new SignalId from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Build a `<owner>/<channel>` label.
    pub fn scoped(owner: &str, channel: &str) -> Self {
        Self(Arc::from(format!("{owner}/{channel}")))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SignalId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for SignalId {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SignalId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignalId({:?})", self.0)
    }
}

impl PartialEq<str> for SignalId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SignalId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for SignalId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SignalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_label() {
        let id = SignalId::scoped("back_right", "turn");
        assert_eq!(id.as_str(), "back_right/turn");
        assert_eq!(id.to_string(), "back_right/turn");
    }

    #[test]
    fn test_clone_shares_storage() {
        let id1: SignalId = "gyro/yaw".into();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_serde() {
        let id: SignalId = "gyro/yaw".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"gyro/yaw\"");

        let parsed: SignalId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
