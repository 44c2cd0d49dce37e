//! Spec-property matching
//!
//! The declared source field is looked up by leaf name anywhere in the source
//! object and compared with the target's name.

use super::{MatchQuery, Relative, ResourceMatcher};
use crate::cluster::object;
use serde_json::Value;

pub(super) async fn find(matcher: &ResourceMatcher<'_>, query: &MatchQuery<'_>) -> Vec<Relative> {
    let Some(leaf) = query.rule.source_leaf() else {
        return Vec::new();
    };
    if query.rule.target_leaf() != "name" {
        tracing::warn!(
            "Unsupported target field '{}' in rule '{}', only 'name' is matched",
            query.rule.target_leaf(),
            query.rule.declaration
        );
        return Vec::new();
    }

    let (sources, targets) = matcher.candidates(query).await;

    let mut relatives = Vec::new();
    for source in &sources {
        let Some(value) = source_field_value(source, leaf) else {
            continue;
        };
        if let Some(target) = targets.iter().find(|t| object::name(t) == value) {
            let details = format!("Name:{} Value:{}", leaf, value);
            relatives.push(query.relative(source, target, details));
        }
    }
    relatives
}

/// Value of a leaf field on a source object
///
/// An unset `serviceAccountName` means the `default` service account.
pub fn source_field_value(obj: &Value, leaf: &str) -> Option<String> {
    object::find_field_by_leaf_name(obj, leaf)
        .or_else(|| (leaf == "serviceAccountName").then(|| "default".to_string()))
}
