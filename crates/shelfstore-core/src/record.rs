//! Product record and its catalog row codec
//!
//! A catalog row is eight text cells. Two of them are lists packed into a
//! single cell with commas:
//!
//! ```text
//! key,name,internal_code,color,manufacturer,container_type,machines,locations
//! OBEN001,Crema,C-12,Neutro,Acme,Vasetto 50ml,"1,2,3","Stanza 1,Stanza 2"
//! ```
//!
//! Decoding is lenient: list tokens that do not parse are dropped, never
//! rejected. List cells are not escaped, so a location containing a comma
//! comes back as two locations.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column names of the catalog file, in order
pub const CATALOG_HEADER: [&str; 8] = [
    "key",
    "name",
    "internal_code",
    "color",
    "manufacturer",
    "container_type",
    "machines",
    "locations",
];

/// List separator inside the `machines` and `locations` cells
pub const LIST_SEPARATOR: char = ',';

/// One product in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Primary key, e.g. `OBEN007`
    pub key: String,
    pub name: String,
    pub internal_code: String,
    /// One of the configured palette colors
    pub color: String,
    pub manufacturer: String,
    pub container_type: String,
    /// Machine numbers, order and duplicates preserved
    pub machines: Vec<u64>,
    /// Storage locations, never empty strings
    pub locations: Vec<String>,
}

/// Raw catalog row as it sits in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub key: String,
    pub name: String,
    pub internal_code: String,
    pub color: String,
    pub manufacturer: String,
    pub container_type: String,
    pub machines: String,
    pub locations: String,
}

impl Product {
    /// Decode a row, applying the lenient list parsing.
    pub fn decode(row: CatalogRow) -> Self {
        Self {
            machines: parse_machines(&row.machines),
            locations: parse_locations(&row.locations),
            key: row.key,
            name: row.name,
            internal_code: row.internal_code,
            color: row.color,
            manufacturer: row.manufacturer,
            container_type: row.container_type,
        }
    }

    /// Encode into a row ready for the CSV writer.
    pub fn encode(&self) -> CatalogRow {
        CatalogRow {
            key: self.key.clone(),
            name: self.name.clone(),
            internal_code: self.internal_code.clone(),
            color: self.color.clone(),
            manufacturer: self.manufacturer.clone(),
            container_type: self.container_type.clone(),
            machines: join_machines(&self.machines),
            locations: join_locations(&self.locations),
        }
    }
}

/// Parse a machines cell such as `"1, 2,x,3"` into `[1, 2, 3]`.
///
/// Tokens are trimmed; anything that is not all ASCII digits (or does not
/// fit in a `u64`) is skipped.
pub fn parse_machines(cell: &str) -> Vec<u64> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter_map(|token| {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                if !token.is_empty() {
                    debug!(
                        target: "shelfstore::record",
                        token,
                        "skipping non-numeric machine token"
                    );
                }
                return None;
            }
            match token.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    debug!(
                        target: "shelfstore::record",
                        token,
                        "skipping out-of-range machine token"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Parse a locations cell such as `"Room A, ,Room B"` into
/// `["Room A", "Room B"]`.
pub fn parse_locations(cell: &str) -> Vec<String> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join machine numbers into a single cell.
pub fn join_machines(machines: &[u64]) -> String {
    machines
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Join locations into a single cell, verbatim.
pub fn join_locations(locations: &[String]) -> String {
    locations.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(machines: &str, locations: &str) -> CatalogRow {
        CatalogRow {
            key: "OBEN001".into(),
            name: "Crema".into(),
            internal_code: "C-12".into(),
            color: "Neutro".into(),
            manufacturer: "Acme".into(),
            container_type: "Vasetto".into(),
            machines: machines.into(),
            locations: locations.into(),
        }
    }

    #[test]
    fn test_machines_lenient_parse() {
        assert_eq!(parse_machines("1, 2,x,3"), vec![1, 2, 3]);
        assert_eq!(parse_machines("4,4,1"), vec![4, 4, 1]);
        assert_eq!(parse_machines("-1,+2, 3 "), vec![3]);
        assert_eq!(parse_machines(""), Vec::<u64>::new());
        assert_eq!(parse_machines("99999999999999999999999,7"), vec![7]);
    }

    #[test]
    fn test_locations_drop_empty_tokens() {
        assert_eq!(parse_locations("Room A, ,Room B"), vec!["Room A", "Room B"]);
        assert_eq!(parse_locations(" , ,"), Vec::<String>::new());
        assert_eq!(
            parse_locations("Stanza 2,Stanza 1,Stanza 2"),
            vec!["Stanza 2", "Stanza 1", "Stanza 2"]
        );
    }

    #[test]
    fn test_decode_canonicalizes_lists() {
        let product = Product::decode(row(" 1 ,2,,z", "A , B,"));
        assert_eq!(product.machines, vec![1, 2]);
        assert_eq!(product.locations, vec!["A", "B"]);

        let encoded = product.encode();
        assert_eq!(encoded.machines, "1,2");
        assert_eq!(encoded.locations, "A,B");
    }

    #[test]
    fn test_canonical_row_reproduced() {
        let original = row("1,2,3", "Stanza 1,Stanza 2");
        assert_eq!(Product::decode(original.clone()).encode(), original);
    }

    #[test]
    fn test_comma_in_location_splits() {
        let product = Product {
            locations: vec!["Scaffale 3, ripiano 2".into()],
            ..Product::decode(row("1", "x"))
        };
        let back = Product::decode(product.encode());
        assert_eq!(back.locations, vec!["Scaffale 3", "ripiano 2"]);
    }

    proptest! {
        #[test]
        fn prop_decode_encode_identity(
            machines in proptest::collection::vec(any::<u64>(), 0..8),
            locations in proptest::collection::vec(
                "[A-Za-z0-9][A-Za-z0-9 ]{0,10}[A-Za-z0-9]",
                0..6,
            ),
        ) {
            let product = Product {
                machines,
                locations,
                ..Product::decode(row("", ""))
            };
            prop_assert_eq!(Product::decode(product.encode()), product);
        }
    }
}
