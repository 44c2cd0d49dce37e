//! Environment-variable matching
//!
//! A container env value equal to a target's name relates the two.

use super::{MatchQuery, Relative, ResourceMatcher};
use crate::cluster::object;

pub(super) async fn find(matcher: &ResourceMatcher<'_>, query: &MatchQuery<'_>) -> Vec<Relative> {
    let (sources, targets) = matcher.candidates(query).await;

    let mut relatives = Vec::new();
    for source in &sources {
        for (name, value) in object::container_env(source) {
            if let Some(target) = targets.iter().find(|t| object::name(t) == value) {
                let details = format!("Name:{} Value:{}", name, value);
                relatives.push(query.relative(source, target, details));
            }
        }
    }
    relatives
}
