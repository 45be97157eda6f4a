use crate::types::{ClusterKey, RawRecord};

/// Canonical form of a company name used for clustering.
///
/// Lower-cases, turns every non-alphanumeric character into a space, collapses
/// whitespace runs and trims. Applying it twice gives the same result as once.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cluster key of a record: normalized company name, `_`, registration number verbatim
pub fn cluster_key(record: &RawRecord) -> ClusterKey {
    ClusterKey::from_parts(&normalize_name(&record.company_name), &record.registration_number)
}
