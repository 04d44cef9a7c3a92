//! Duplicate detection for statement imports
//!
//! Every parser that can identify a row builds the same fingerprint:
//! `{source}-{id_part}-{YYYYMMDD}-{amount:.2}`. The fingerprint is unique per
//! user in storage; [`DedupSet`] mirrors that constraint in memory for the
//! length of one batch so a batch also deduplicates against itself.

use std::collections::HashSet;

use chrono::NaiveDate;

/// Build the dedup fingerprint for a transaction
pub fn unique_key(source: &str, id_part: &str, date: NaiveDate, amount: f64) -> String {
    format!(
        "{}-{}-{}-{:.2}",
        source,
        id_part,
        date.format("%Y%m%d"),
        amount
    )
}

/// Known fingerprints for one user, owned by a single import batch
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    /// Seed the set with keys already in storage
    pub fn new(existing: impl IntoIterator<Item = String>) -> Self {
        Self {
            seen: existing.into_iter().collect(),
        }
    }

    /// Decide whether a row is new, recording its key when it is
    ///
    /// Rows without a key are always admitted.
    pub fn admit(&mut self, key: Option<&str>) -> bool {
        match key {
            None => true,
            Some(key) => {
                if self.seen.contains(key) {
                    false
                } else {
                    self.seen.insert(key.to_string());
                    true
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unique_key_format() {
        assert_eq!(
            unique_key("hdfc", "000123", date(2024, 1, 5), 1200.0),
            "hdfc-000123-20240105-1200.00"
        );
        assert_eq!(
            unique_key("sbi", "UPI-SWIGG-4", date(2023, 12, 31), 99.5),
            "sbi-UPI-SWIGG-4-20231231-99.50"
        );
    }

    #[test]
    fn test_existing_keys_are_duplicates() {
        let mut set = DedupSet::new(vec!["a".to_string()]);
        assert!(!set.admit(Some("a")));
        assert!(set.admit(Some("b")));
    }

    #[test]
    fn test_batch_self_dedup() {
        let mut set = DedupSet::default();
        assert!(set.admit(Some("k")));
        assert!(!set.admit(Some("k")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_missing_key_always_admitted() {
        let mut set = DedupSet::default();
        assert!(set.admit(None));
        assert!(set.admit(None));
        assert!(set.is_empty());
    }
}
