//! Content fingerprinting and duplicate removal

use std::collections::HashSet;
use std::fmt;

use crate::domain::product::{NOT_AVAILABLE, NormalizedProductRecord};

/// blake3 digest of the stripped `name::dimensions` key.
///
/// Two listings of the same physical product usually differ in URL and id
/// but not in title and size, so neither of those feeds the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductFingerprint(String);

impl ProductFingerprint {
    pub fn of(record: &NormalizedProductRecord) -> Self {
        let dims = record.dimensions.as_deref().unwrap_or(NOT_AVAILABLE);
        let key = format!("{}::{}", Self::strip(&record.name), Self::strip(dims));
        Self(blake3::hash(key.as_bytes()).to_hex().to_string())
    }

    /// Lowercase and drop everything that isn't a letter or digit.
    fn strip(text: &str) -> String {
        text.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drop records whose fingerprint was already seen, keeping first-seen order.
pub fn dedupe(records: Vec<NormalizedProductRecord>) -> Vec<NormalizedProductRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(ProductFingerprint::of(record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, name: &str, dims: Option<&str>) -> NormalizedProductRecord {
        NormalizedProductRecord {
            id: id.into(),
            name: name.into(),
            url: format!("https://www.example.com/dp/{id}"),
            rating: None,
            image_url: None,
            dimensions: dims.map(str::to_string),
            price: None,
        }
    }

    #[test]
    fn fingerprint_ignores_case_spacing_and_punctuation() {
        let a = record("A1", "Oak Study-Table, Brown", Some("120 x 60 cm"));
        let b = record("B2", "oak study table brown", Some("120x60cm"));
        assert_eq!(ProductFingerprint::of(&a), ProductFingerprint::of(&b));
    }

    #[test]
    fn different_dimensions_are_different_products() {
        let a = record("A1", "Oak Table", Some("120 x 60 cm"));
        let b = record("A2", "Oak Table", Some("150 x 90 cm"));
        assert_ne!(ProductFingerprint::of(&a), ProductFingerprint::of(&b));
    }

    #[test]
    fn dedupe_keeps_first_seen() {
        let records = vec![
            record("A1", "Sofa", None),
            record("A2", "Chair", None),
            record("A3", "SOFA", None),
        ];
        let unique = dedupe(records);
        let ids: Vec<_> = unique.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A1", "A2"]);
    }

    fn arb_record() -> impl Strategy<Value = NormalizedProductRecord> {
        (
            "[A-Z0-9]{10}",
            prop::sample::select(vec!["Sofa", "sofa", "Study Table", "Bed", "bed!"]),
            prop::option::of(prop::sample::select(vec!["120 x 60 cm", "120x60 cm", "90 cm"])),
        )
            .prop_map(|(id, name, dims)| record(&id, name, dims))
    }

    proptest! {
        #[test]
        fn dedupe_is_idempotent_and_never_grows(records in prop::collection::vec(arb_record(), 0..30)) {
            let once = dedupe(records.clone());
            prop_assert!(once.len() <= records.len());
            prop_assert_eq!(dedupe(once.clone()), once);
        }

        #[test]
        fn fingerprint_does_not_depend_on_id_or_url(id_a in "[A-Z0-9]{10}", id_b in "[a-z]{3}itm[0-9]{6}") {
            let a = record(&id_a, "Coffee Table", Some("45 x 45 cm"));
            let mut b = record(&id_b, "Coffee Table", Some("45 x 45 cm"));
            b.url = format!("https://www.flipkart.com/p/{id_b}");
            prop_assert_eq!(ProductFingerprint::of(&a), ProductFingerprint::of(&b));
        }
    }
}
