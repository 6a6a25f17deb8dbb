//! Partitioning of a panel's queries by datasource.

use std::collections::BTreeMap;

use vitrine_core::QueryDescriptor;

/// Group queries sharing the same datasource uid.
///
/// Queries keep their relative order inside a group. Queries without a
/// resolvable uid are collected under the `None` key instead of being dropped.
pub fn group_queries_by_datasource(
    queries: &[QueryDescriptor],
) -> BTreeMap<Option<String>, Vec<QueryDescriptor>> {
    let mut groups: BTreeMap<Option<String>, Vec<QueryDescriptor>> = BTreeMap::new();
    for query in queries {
        groups
            .entry(query.datasource_uid())
            .or_default()
            .push(query.clone());
    }
    groups
}
