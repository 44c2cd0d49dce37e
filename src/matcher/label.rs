//! Label-selector matching

use super::{MatchQuery, Relative, ResourceMatcher};
use crate::cluster::object;
use std::collections::BTreeMap;

/// Sources whose non-empty selector is a subset of a target's labels
pub(super) async fn find(matcher: &ResourceMatcher<'_>, query: &MatchQuery<'_>) -> Vec<Relative> {
    let (sources, targets) = matcher.candidates(query).await;

    let mut relatives = Vec::new();
    for source in &sources {
        let selector = object::selector(source);
        // An empty selector would match everything
        if selector.is_empty() {
            continue;
        }
        for target in &targets {
            if object::is_subset(&selector, &object::labels(target)) {
                relatives.push(query.relative(source, target, describe(&selector)));
            }
        }
    }
    relatives
}

fn describe(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}
