//! Subtype → category lookup used when building the combined dataset

/// Fixed furniture taxonomy. Subtypes are the normalized query slugs that
/// name the per-query files (`amazon_study_table.json` → `study_table`).
const CATEGORY_TABLE: &[(&str, &str)] = &[
    ("dining_table", "Table"),
    ("study_table", "Table"),
    ("coffee_table", "Table"),
    ("casual_table", "Table"),
    ("tea_table", "Table"),
    ("dining_chair", "Chair"),
    ("casual_chair", "Chair"),
    ("gaming_chair", "Chair"),
    ("office_chair", "Chair"),
    ("rocking_chair", "Chair"),
    ("bed", "Bed"),
    ("double_bed", "Bed"),
    ("queen_size_bed", "Bed"),
    ("king_size_bed", "Bed"),
    ("single_bed", "Bed"),
    ("sofa", "Sofa"),
    ("recliner_sofa", "Sofa"),
    ("sofa_cum_bed", "Sofa"),
    ("sofa_set", "Sofa"),
    ("storage", "Storage"),
    ("bookshelf", "Storage"),
    ("wardrobe", "Storage"),
    ("cupboard", "Storage"),
    ("cabinet", "Storage"),
    ("shoe_rack", "Storage"),
];

/// Slug for a query with no usable characters
const EMPTY_QUERY_SLUG: &str = "query";

/// Category for a subtype; unmapped subtypes get an empty category.
pub fn category_for(subtype: &str) -> &'static str {
    CATEGORY_TABLE
        .iter()
        .find(|(key, _)| *key == subtype)
        .map_or("", |(_, category)| category)
}

/// Turn a free-text query into the slug used in file names and subtypes.
/// Only `[a-z0-9_]` survives; every other run of characters becomes one `_`.
pub fn query_slug(query: &str) -> String {
    let lowered = query.to_lowercase();
    let slug = lowered
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if slug.is_empty() { EMPTY_QUERY_SLUG.to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_subtypes_map_to_categories() {
        assert_eq!(category_for("study_table"), "Table");
        assert_eq!(category_for("gaming_chair"), "Chair");
        assert_eq!(category_for("shoe_rack"), "Storage");
    }

    #[test]
    fn unmapped_subtype_gets_empty_category() {
        assert_eq!(category_for("bean_bag"), "");
        assert_eq!(category_for(""), "");
    }

    #[test]
    fn slug_lowercases_and_joins_words() {
        assert_eq!(query_slug("Study Table"), "study_table");
        assert_eq!(query_slug("  king  size bed "), "king_size_bed");
    }

    #[test]
    fn slug_never_contains_path_characters() {
        assert_eq!(query_slug("3/4 bed"), "3_4_bed");
        assert_eq!(query_slug("../sofa-cum-bed"), "sofa_cum_bed");
        assert_eq!(query_slug(r"tv\unit: 'wall'"), "tv_unit_wall");
        assert_eq!(query_slug(" // "), "query");
    }
}
