use std::collections::BTreeMap;

use crate::tracker::constants::MAX_DIMENSION_VALUE_LENGTH;
use crate::tracker::error::{invalid_argument, TrackerResult};

/// Custom dimension values applied to every request built after they are set.
///
/// Requires the Custom Dimensions plugin on the Matomo server. Ids start at `1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionRegistry {
    entries: BTreeMap<i64, String>,
}

/// Immutable copy of the registry taken for a single request build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionSnapshot {
    entries: BTreeMap<i64, String>,
}

/// Result of a successful [`DimensionRegistry::set`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionUpdate {
    Stored,
    Truncated,
    Removed,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `id`, or removes `id` when `value` is `None` or empty.
    ///
    /// Values longer than 255 characters are cut down to 255 characters.
    pub fn set(&mut self, id: i64, value: Option<&str>) -> TrackerResult<DimensionUpdate> {
        if id < 1 {
            return Err(invalid_argument(format!("custom dimension id must be >= 1, got {id}")));
        }

        let value = match value {
            Some(value) if !value.is_empty() => value,
            _ => {
                self.entries.remove(&id);
                return Ok(DimensionUpdate::Removed);
            }
        };

        if value.chars().count() > MAX_DIMENSION_VALUE_LENGTH {
            let truncated: String = value.chars().take(MAX_DIMENSION_VALUE_LENGTH).collect();
            self.entries.insert(id, truncated);
            return Ok(DimensionUpdate::Truncated);
        }

        self.entries.insert(id, value.to_owned());
        Ok(DimensionUpdate::Stored)
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn snapshot(&self) -> DimensionSnapshot {
        DimensionSnapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DimensionSnapshot {
    pub fn get(&self, id: i64) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> + '_ {
        self.entries.iter().map(|(id, value)| (*id, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> BTreeMap<i64, String> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::error::TrackerErrorCode;

    #[test]
    fn empty_and_missing_values_remove_entry() {
        let mut registry = DimensionRegistry::new();
        registry.set(1, Some("free")).unwrap();
        registry.set(2, Some("beta")).unwrap();

        assert_eq!(registry.set(1, Some("")).unwrap(), DimensionUpdate::Removed);
        assert_eq!(registry.set(2, None).unwrap(), DimensionUpdate::Removed);
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_updates() {
        let mut registry = DimensionRegistry::new();
        registry.set(3, Some("gold")).unwrap();
        let snapshot = registry.snapshot();

        registry.set(3, Some("silver")).unwrap();
        registry.set(4, Some("new")).unwrap();

        assert_eq!(snapshot.get(3), Some("gold"));
        assert_eq!(snapshot.get(4), None);
        assert_eq!(registry.get(3), Some("silver"));
    }

    #[test]
    fn rejects_non_positive_ids() {
        let mut registry = DimensionRegistry::new();
        let err = registry.set(0, Some("value")).unwrap_err();
        assert_eq!(err.code, TrackerErrorCode::InvalidArgument);
        assert!(registry.is_empty());
    }

    #[test]
    fn long_values_are_truncated() {
        let mut registry = DimensionRegistry::new();
        let long = "é".repeat(300);
        assert_eq!(registry.set(1, Some(&long)).unwrap(), DimensionUpdate::Truncated);
        assert_eq!(registry.get(1).map(|v| v.chars().count()), Some(255));
    }

    #[test]
    fn clear_removes_everything() {
        let mut registry = DimensionRegistry::new();
        registry.set(1, Some("a")).unwrap();
        registry.set(2, Some("b")).unwrap();
        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
