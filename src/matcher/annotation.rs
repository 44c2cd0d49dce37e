//! Annotation matching
//!
//! A target relates to a source when the declared annotation on the target
//! names the source, either exactly or as one entry of a comma-separated list.

use super::{MatchQuery, Relative, ResourceMatcher};
use crate::cluster::object;

pub(super) async fn find(matcher: &ResourceMatcher<'_>, query: &MatchQuery<'_>) -> Vec<Relative> {
    let Some(key) = query.rule.annotation_key() else {
        return Vec::new();
    };
    let (sources, targets) = matcher.candidates(query).await;
    let pattern = query.rule.value_pattern.as_deref().unwrap_or("");

    let mut relatives = Vec::new();
    for source in &sources {
        let source_name = object::name(source);
        for target in &targets {
            let annotations = object::annotations(target);
            if annotations
                .get(key)
                .is_some_and(|value| references(value, source_name))
            {
                let details = format!("{}::{}", key, pattern);
                relatives.push(query.relative(source, target, details));
            }
        }
    }
    relatives
}

fn references(value: &str, name: &str) -> bool {
    !name.is_empty() && value.split(',').any(|entry| entry.trim() == name)
}
