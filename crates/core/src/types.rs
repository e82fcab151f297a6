//! Shared value-domain types: [`Granularity`], [`IndexName`], [`KvKey`], and
//! the plain type aliases for entity/epoch/partition values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identifier. Arbitrary signed 64-bit integer.
pub type EntityId = i64;

/// A non-negative 32-bit epoch value, in the unit defined by its [`Granularity`].
pub type EpochValue = u32;

/// A partition number within one (index, entity, granularity) series.
pub type Partition = i64;

/// Temporal quantization unit.
///
/// Each variant has a documented encoding relative to 1970-01-01 UTC; see
/// `e4s-time` for the codec that converts between wall-clock milliseconds
/// and these integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Integer days since 1970-01-01 UTC.
    Day,
    /// `(year - 1970) * 12 + (month_of_year - 1)`, UTC calendar.
    Month,
    /// `year - 1970`, UTC calendar.
    Year,
}

impl Granularity {
    /// Lowercase name used in [`KvKey`] and HTTP wire strings' canonical form.
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    /// Upper-case name as transported on the HTTP surface (`"DAY"`/`"MONTH"`/`"YEAR"`).
    pub fn as_upper(&self) -> &'static str {
        match self {
            Granularity::Day => "DAY",
            Granularity::Month => "MONTH",
            Granularity::Year => "YEAR",
        }
    }

    /// Parse from the HTTP wire representation. Case-sensitive per `spec.md` §6.
    pub fn parse_upper(s: &str) -> Option<Self> {
        match s {
            "DAY" => Some(Granularity::Day),
            "MONTH" => Some(Granularity::Month),
            "YEAR" => Some(Granularity::Year),
            _ => None,
        }
    }

    /// All three variants, in a stable order, for iteration (e.g. `evictEntity`'s
    /// cache sweep across granularities).
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Month, Granularity::Year];
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_upper())
    }
}

/// Maximum length of an index name. Not specified numerically by `spec.md`;
/// chosen generously since the name is also used as a fast-store key-prefix
/// component and a relational-store column value.
pub const MAX_INDEX_NAME_LENGTH: usize = 256;

/// Validated, non-empty index name matching `[A-Za-z0-9_-]+`.
///
/// Acts as the tenant/namespace boundary: every fast-store key and durable
/// row for an index is prefixed or scoped by its `IndexName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexName(String);

/// Error validating an [`IndexName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNameError {
    /// Name is empty.
    Empty,
    /// Name exceeds [`MAX_INDEX_NAME_LENGTH`].
    TooLong {
        /// Actual length.
        length: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Name contains a character outside `[A-Za-z0-9_-]`.
    InvalidChar {
        /// The offending character.
        char: char,
        /// Its position in the name.
        position: usize,
    },
}

impl fmt::Display for IndexNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexNameError::Empty => write!(f, "index name cannot be empty"),
            IndexNameError::TooLong { length, max } => {
                write!(f, "index name too long: {} chars (max {})", length, max)
            }
            IndexNameError::InvalidChar { char, position } => write!(
                f,
                "invalid character '{}' at position {} (only [A-Za-z0-9_-] allowed)",
                char, position
            ),
        }
    }
}

impl std::error::Error for IndexNameError {}

impl IndexName {
    /// Validate and construct an `IndexName`.
    pub fn new(name: impl Into<String>) -> Result<Self, IndexNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(IndexName(name))
    }

    /// Construct without validation. Callers must ensure the name already
    /// satisfies [`Self::validate`] — used when round-tripping a name already
    /// stored in the registry.
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        IndexName(name.into())
    }

    /// Validate a candidate index name against `[A-Za-z0-9_-]+`.
    pub fn validate(name: &str) -> Result<(), IndexNameError> {
        if name.is_empty() {
            return Err(IndexNameError::Empty);
        }
        if name.len() > MAX_INDEX_NAME_LENGTH {
            return Err(IndexNameError::TooLong {
                length: name.len(),
                max: MAX_INDEX_NAME_LENGTH,
            });
        }
        for (position, char) in name.chars().enumerate() {
            if !(char.is_ascii_alphanumeric() || char == '_' || char == '-') {
                return Err(IndexNameError::InvalidChar { char, position });
            }
        }
        Ok(())
    }

    /// Borrow as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for IndexName {
    type Error = IndexNameError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        IndexName::new(value)
    }
}

impl TryFrom<&str> for IndexName {
    type Error = IndexNameError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        IndexName::new(value)
    }
}

/// Fast-store key for the registry of known index names.
pub const REGISTRY_KEY: &str = "e4s:index:registry";

/// Canonical string identity of a partition bitset: the fast-store key and
/// the key-lock table key are the same string.
///
/// Format: `"e4s:index:{indexName}:{granularity_lowercase}:{entityId}:{partition}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KvKey(String);

impl KvKey {
    /// Build the canonical key for a partition bitset.
    pub fn new(
        index: &IndexName,
        granularity: Granularity,
        entity: EntityId,
        partition: Partition,
    ) -> Self {
        KvKey(format!(
            "e4s:index:{}:{}:{}:{}",
            index.as_str(),
            granularity.as_lowercase(),
            entity,
            partition
        ))
    }

    /// The key-prefix that identifies every key belonging to `index` across
    /// all granularities, entities, and partitions. Used by `deleteIndex`'s
    /// `scanKeys` call and by `evictIndex`.
    pub fn index_prefix(index: &IndexName) -> String {
        format!("e4s:index:{}:", index.as_str())
    }

    /// The key-prefix that identifies every DAY-granularity key belonging to
    /// `index`. `entityCount` uses this as a coarse, fast entity-count proxy.
    pub fn day_prefix(index: &IndexName) -> String {
        format!("e4s:index:{}:{}:", index.as_str(), Granularity::Day.as_lowercase())
    }

    /// Borrow the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for KvKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_name_validates_charset() {
        assert!(IndexName::new("meter-data").is_ok());
        assert!(IndexName::new("meter_data_2").is_ok());
        assert!(IndexName::new("").is_err());
        assert!(IndexName::new("has space").is_err());
        assert!(IndexName::new("has/slash").is_err());
    }

    #[test]
    fn kv_key_format() {
        let idx = IndexName::new("meter-data").unwrap();
        let key = KvKey::new(&idx, Granularity::Day, 12345, 111);
        assert_eq!(key.as_str(), "e4s:index:meter-data:day:12345:111");
    }

    #[test]
    fn granularity_wire_round_trip() {
        for g in Granularity::ALL {
            assert_eq!(Granularity::parse_upper(g.as_upper()), Some(g));
        }
        assert_eq!(Granularity::parse_upper("day"), None);
    }
}
