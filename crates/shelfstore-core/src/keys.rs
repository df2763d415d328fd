//! Sequential catalog key suggestions (`OBEN001`, `OBEN002`, ...)

use crate::config::Config;

/// Suggests the next free key for a fixed prefix.
///
/// The suggestion is advisory. Nothing downstream enforces the format, and
/// callers may submit any key that is not already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAllocator {
    prefix: String,
    width: usize,
}

impl KeyAllocator {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.key_prefix.clone(), config.key_width)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Highest numeric suffix among `keys` carrying the prefix. Keys whose
    /// suffix is not an integer are ignored.
    pub fn highest<'a, I>(&self, keys: I) -> Option<u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter_map(|key| key.strip_prefix(self.prefix.as_str()))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
    }

    /// `prefix + zero_pad(highest + 1)`, or `prefix + zero_pad(1)` when no
    /// key matches. Numbers wider than the pad are never truncated.
    pub fn suggest<'a, I>(&self, keys: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let next = self.highest(keys).map_or(1, |n| n.saturating_add(1));
        self.format(next)
    }

    /// Render a sequence number as a key.
    pub fn format(&self, n: u64) -> String {
        format!("{}{:0width$}", self.prefix, n, width = self.width)
    }
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::new("OBEN", 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_after_gap() {
        let alloc = KeyAllocator::default();
        assert_eq!(alloc.suggest(["OBEN001", "OBEN003", "BADKEY"]), "OBEN004");
    }

    #[test]
    fn test_no_matching_prefix() {
        let alloc = KeyAllocator::default();
        assert_eq!(alloc.suggest(std::iter::empty()), "OBEN001");
        assert_eq!(alloc.suggest(["BADKEY", "XYZ010"]), "OBEN001");
    }

    #[test]
    fn test_unparsable_suffix_ignored() {
        let alloc = KeyAllocator::default();
        assert_eq!(alloc.suggest(["OBEN002", "OBENxyz", "OBEN", "OBEN-5"]), "OBEN003");
    }

    #[test]
    fn test_wide_numbers_not_truncated() {
        let alloc = KeyAllocator::default();
        assert_eq!(alloc.suggest(["OBEN999"]), "OBEN1000");
        assert_eq!(alloc.suggest(["OBEN0042"]), "OBEN043");
    }

    #[test]
    fn test_custom_prefix_and_width() {
        let alloc = KeyAllocator::new("SKU", 5);
        assert_eq!(alloc.suggest(["SKU00007", "OBEN100"]), "SKU00008");
        assert_eq!(alloc.format(12), "SKU00012");
    }
}
