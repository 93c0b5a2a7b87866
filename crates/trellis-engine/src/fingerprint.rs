//! Parameter fingerprints
//!
//! A node's resolved parameters are hashed so re-runs can decide between
//! Update and no-op without diffing full parameter trees. `BTreeMap` keys
//! serialize in a stable order, so equal parameters always hash equally.

use trellis_provider::ResolvedParams;

/// Hex blake3 fingerprint of resolved parameters
pub fn fingerprint(params: &ResolvedParams) -> String {
    // A map of String to serde_json::Value always serializes.
    let bytes = serde_json::to_vec(params).expect("resolved params serialize to JSON");
    blake3::hash(&bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_params_hash_equally() {
        let mut a = ResolvedParams::new();
        a.insert("name".into(), json!("supervisor"));
        a.insert("store_id".into(), json!("store-1"));

        let mut b = ResolvedParams::new();
        b.insert("store_id".into(), json!("store-1"));
        b.insert("name".into(), json!("supervisor"));

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn changed_value_changes_fingerprint() {
        let mut a = ResolvedParams::new();
        a.insert("name".into(), json!("supervisor"));
        let mut b = a.clone();
        b.insert("name".into(), json!("coordinator"));

        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
