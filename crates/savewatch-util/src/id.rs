//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in savewatch follow the pattern: `prefix_ulid`
//! For example: `ses_01HQXYZ...` for sessions, `snp_01HQXYZ...` for snapshots.

use once_cell::sync::Lazy;
use std::sync::Mutex;
use ulid::{Generator, Ulid};

/// Process-wide monotonic generator, so ids minted in the same millisecond
/// still differ and sort in creation order.
static GENERATOR: Lazy<Mutex<Generator>> = Lazy::new(|| Mutex::new(Generator::new()));

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Session,
    Snapshot,
}

impl IdPrefix {
    /// Get the string prefix for this identifier type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Session => "ses",
            IdPrefix::Snapshot => "snp",
        }
    }

    /// Parse a prefix from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ses" => Some(IdPrefix::Session),
            "snp" => Some(IdPrefix::Snapshot),
            _ => None,
        }
    }
}

/// Identifier generation and parsing utilities.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        Self::with_ulid(prefix, next_ulid())
    }

    /// Generate a new descending identifier (newer = smaller).
    ///
    /// Session ids use this so the most recent session directory sorts first.
    pub fn descending(prefix: IdPrefix) -> String {
        let inverted = Ulid(!next_ulid().0);
        Self::with_ulid(prefix, inverted)
    }

    /// Generate an identifier with a specific ULID (for testing or imports).
    pub fn with_ulid(prefix: IdPrefix, ulid: Ulid) -> String {
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Parse an identifier into its prefix and ULID parts.
    pub fn parse(id: &str) -> Option<(IdPrefix, Ulid)> {
        let (prefix, ulid) = id.split_once('_')?;
        let prefix = IdPrefix::parse(prefix)?;
        let ulid = Ulid::from_string(ulid).ok()?;
        Some((prefix, ulid))
    }

    /// Check if an identifier has the expected prefix.
    pub fn has_prefix(id: &str, prefix: IdPrefix) -> bool {
        id.starts_with(prefix.as_str()) && id.chars().nth(prefix.as_str().len()) == Some('_')
    }

    /// Generate a session ID (descending for recency sort).
    pub fn session() -> String {
        Self::descending(IdPrefix::Session)
    }

    /// Generate a snapshot ID (ascending, unique within the process).
    pub fn snapshot() -> String {
        Self::ascending(IdPrefix::Snapshot)
    }
}

fn next_ulid() -> Ulid {
    let mut generator = GENERATOR.lock().unwrap_or_else(|e| e.into_inner());
    // Overflow of the random component within one millisecond is the only
    // failure; a fresh random ULID is still unique in practice.
    generator.generate().unwrap_or_else(|_| Ulid::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ascending_id() {
        let id = Identifier::ascending(IdPrefix::Snapshot);
        assert!(id.starts_with("snp_"));
        assert_eq!(id.len(), 30); // "snp_" (4) + ULID (26)
    }

    #[test]
    fn test_descending_id() {
        let id = Identifier::descending(IdPrefix::Session);
        assert!(id.starts_with("ses_"));
        assert_eq!(id.len(), 30);
    }

    #[test]
    fn test_ascending_ids_are_strictly_increasing() {
        let ids: Vec<String> = (0..100).map(|_| Identifier::snapshot()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_snapshot_ids_unique_in_burst() {
        let ids: HashSet<String> = (0..10_000).map(|_| Identifier::snapshot()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_descending_order() {
        let id1 = Identifier::descending(IdPrefix::Session);
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = Identifier::descending(IdPrefix::Session);
        assert!(id1 > id2, "Descending IDs should decrease over time");
    }

    #[test]
    fn test_parse_id() {
        let id = Identifier::snapshot();
        let (prefix, _ulid) = Identifier::parse(&id).unwrap();
        assert_eq!(prefix, IdPrefix::Snapshot);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Identifier::parse("nounderscore").is_none());
        assert!(Identifier::parse("xyz_01HQXYZ").is_none());
        assert!(Identifier::parse("ses_notaulid").is_none());
    }

    #[test]
    fn test_has_prefix() {
        let id = Identifier::session();
        assert!(Identifier::has_prefix(&id, IdPrefix::Session));
        assert!(!Identifier::has_prefix(&id, IdPrefix::Snapshot));
        assert!(!Identifier::has_prefix("ses123", IdPrefix::Session));
    }

    #[test]
    fn test_with_ulid_round_trips() {
        let ulid = Ulid::new();
        let id = Identifier::with_ulid(IdPrefix::Snapshot, ulid);
        let (_, parsed) = Identifier::parse(&id).unwrap();
        assert_eq!(parsed, ulid);
    }
}
