//! Relationship catalog
//!
//! In-memory mapping from resource kind to its declared relationship rules,
//! its containment (composition) children and the API details needed to
//! list or get instances of it. The catalog is built once, then shared
//! read-only by the matcher, walker and composition builder.

pub mod builtin;
pub mod declarations;
pub mod rule;

pub use declarations::{KindDeclaration, declaration_from_crd, load_declarations_file};
pub use rule::{RelationKind, RelationshipRule, RuleParseError};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Errors raised while loading declarations into the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read declarations file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse declarations file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// API coordinates of a kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDetails {
    pub plural: String,
    pub group: String,
    pub version: String,
    pub namespaced: bool,
}

impl ApiDetails {
    pub fn new(
        plural: impl Into<String>,
        group: impl Into<String>,
        version: impl Into<String>,
        namespaced: bool,
    ) -> Self {
        Self {
            plural: plural.into(),
            group: group.into(),
            version: version.into(),
            namespaced,
        }
    }

    /// Build details from an endpoint such as `apis/apps/v1`, `api/v1` or `networking.k8s.io/v1`
    pub fn from_endpoint(plural: impl Into<String>, endpoint: &str, namespaced: bool) -> Self {
        let trimmed = endpoint.trim().trim_matches('/');
        let trimmed = trimmed
            .strip_prefix("apis/")
            .or_else(|| trimmed.strip_prefix("api/"))
            .unwrap_or(trimmed);

        let (group, version) = match trimmed.rsplit_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), trimmed.to_string()),
        };

        Self {
            plural: plural.into(),
            group,
            version,
            namespaced,
        }
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Relationship declaration store keyed by kind
#[derive(Debug, Clone, Default)]
pub struct RelationshipCatalog {
    api: BTreeMap<String, ApiDetails>,
    rules: BTreeMap<String, Vec<RelationshipRule>>,
    compositions: BTreeMap<String, Vec<String>>,
}

impl RelationshipCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the built-in kinds
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for entry in builtin::BUILTIN_KINDS {
            catalog.register_kind(
                entry.kind,
                ApiDetails::new(entry.plural, entry.group, entry.version, entry.namespaced),
            );
            catalog.set_composition(
                entry.kind,
                entry.composition.iter().map(|c| c.to_string()).collect(),
            );
            catalog.add_declarations(entry.kind, entry.relationships.iter().copied());
        }
        catalog
    }

    /// Register or replace the API details of a kind
    pub fn register_kind(&mut self, kind: &str, details: ApiDetails) {
        self.api.insert(kind.to_string(), details);
    }

    /// Replace the composition children of a kind
    pub fn set_composition(&mut self, kind: &str, children: Vec<String>) {
        let children: Vec<String> = children
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self.compositions.insert(kind.to_string(), children);
    }

    /// Add an already parsed rule, ignoring exact duplicates
    pub fn add_rule(&mut self, kind: &str, rule: RelationshipRule) {
        let rules = self.rules.entry(kind.to_string()).or_default();
        let duplicate = rules.iter().any(|existing| {
            existing.relation == rule.relation
                && existing.target_kind == rule.target_kind
                && existing.source_field == rule.source_field
                && existing.target_field == rule.target_field
        });
        if !duplicate {
            rules.push(rule);
        }
    }

    /// Parse and add declarations for a kind
    ///
    /// Malformed declarations are skipped with a warning and returned so
    /// callers can report them.
    pub fn add_declarations<'a, I>(&mut self, kind: &str, declarations: I) -> Vec<RuleParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut errors = Vec::new();
        for declaration in declarations {
            match RelationshipRule::parse(declaration) {
                Ok(rule) => self.add_rule(kind, rule),
                Err(e) => {
                    tracing::warn!(
                        "Skipping relationship declaration '{}' for {}: {}",
                        declaration,
                        kind,
                        e
                    );
                    errors.push(e);
                }
            }
        }
        errors
    }

    /// Merge a kind declaration into the catalog
    ///
    /// API details and composition are replaced when present; rules are added.
    pub fn apply_declaration(&mut self, declaration: &KindDeclaration) -> Vec<RuleParseError> {
        if let Some(details) = declaration.api_details() {
            self.register_kind(&declaration.kind, details);
        }
        if !declaration.composition.is_empty() {
            self.set_composition(&declaration.kind, declaration.composition.clone());
        }
        self.add_declarations(
            &declaration.kind,
            declaration.relationships.iter().map(String::as_str),
        )
    }

    /// Rules declared by `kind`
    pub fn rules_for(&self, kind: &str) -> &[RelationshipRule] {
        self.rules.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kinds whose own rules name `kind` as their target
    pub fn reverse_kinds(&self, kind: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(_, rules)| rules.iter().any(|r| r.target_kind == kind))
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Kinds that may carry an owner reference pointing at `kind`
    ///
    /// Union of the owner-reference targets declared by `kind` and its
    /// composition children.
    pub fn child_kinds(&self, kind: &str) -> Vec<String> {
        let mut children: BTreeSet<String> = self
            .rules_for(kind)
            .iter()
            .filter(|r| r.relation == RelationKind::OwnerReference)
            .map(|r| r.target_kind.clone())
            .collect();
        children.extend(self.composition_children(kind).iter().cloned());
        children.into_iter().collect()
    }

    /// Declared composition children of `kind`
    pub fn composition_children(&self, kind: &str) -> &[String] {
        self.compositions
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Kinds with at least one composition child
    pub fn composition_kinds(&self) -> Vec<String> {
        self.compositions
            .iter()
            .filter(|(_, children)| !children.is_empty())
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    pub fn api_details(&self, kind: &str) -> Option<&ApiDetails> {
        self.api.get(kind)
    }

    /// All kinds known to the catalog, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: BTreeSet<String> = self.api.keys().cloned().collect();
        kinds.extend(self.rules.keys().cloned());
        kinds.extend(self.compositions.keys().cloned());
        kinds.into_iter().collect()
    }

    /// Resolve a user supplied kind name (case-insensitive kind or plural)
    pub fn resolve_kind(&self, input: &str) -> Option<String> {
        let wanted = input.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.kinds().into_iter().find(|kind| {
            kind.to_lowercase() == wanted
                || self
                    .api
                    .get(kind)
                    .is_some_and(|details| details.plural.to_lowercase() == wanted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_for_service() {
        let catalog = RelationshipCatalog::builtin();
        let rules = catalog.rules_for("Service");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].relation, RelationKind::Label);
        assert_eq!(rules[0].target_kind, "Pod");
    }

    #[test]
    fn test_reverse_kinds() {
        let catalog = RelationshipCatalog::builtin();
        let reverse = catalog.reverse_kinds("Service");
        assert!(reverse.contains(&"Pod".to_string()));
        assert!(reverse.contains(&"Ingress".to_string()));

        let reverse = catalog.reverse_kinds("PersistentVolume");
        assert_eq!(reverse, vec!["PersistentVolumeClaim".to_string()]);
    }

    #[test]
    fn test_child_kinds() {
        let catalog = RelationshipCatalog::builtin();
        assert_eq!(catalog.child_kinds("Deployment"), vec!["ReplicaSet".to_string()]);
        assert_eq!(
            catalog.child_kinds("StatefulSet"),
            vec!["Pod".to_string(), "ReplicaSet".to_string()]
        );
        assert!(catalog.child_kinds("Pod").is_empty());
    }

    #[test]
    fn test_composition_kinds_skip_empty() {
        let catalog = RelationshipCatalog::builtin();
        let kinds = catalog.composition_kinds();
        assert!(kinds.contains(&"Deployment".to_string()));
        assert!(!kinds.contains(&"Pod".to_string()));
    }

    #[test]
    fn test_api_details() {
        let catalog = RelationshipCatalog::builtin();
        let details = catalog.api_details("Deployment").unwrap();
        assert_eq!(details.plural, "deployments");
        assert_eq!(details.api_version(), "apps/v1");
        assert_eq!(catalog.api_details("Pod").unwrap().api_version(), "v1");
        assert!(!catalog.api_details("PersistentVolume").unwrap().namespaced);
    }

    #[test]
    fn test_from_endpoint() {
        let details = ApiDetails::from_endpoint("moodles", "apis/moodlecontroller.kubeplus/v1", true);
        assert_eq!(details.group, "moodlecontroller.kubeplus");
        assert_eq!(details.version, "v1");

        let details = ApiDetails::from_endpoint("pods", "api/v1", true);
        assert_eq!(details.group, "");
        assert_eq!(details.version, "v1");

        let details = ApiDetails::from_endpoint("ingresses", "networking.k8s.io/v1", true);
        assert_eq!(details.api_version(), "networking.k8s.io/v1");
    }

    #[test]
    fn test_resolve_kind() {
        let catalog = RelationshipCatalog::builtin();
        assert_eq!(catalog.resolve_kind("deployment").as_deref(), Some("Deployment"));
        assert_eq!(catalog.resolve_kind("Pods").as_deref(), Some("Pod"));
        assert_eq!(
            catalog.resolve_kind("persistentvolumeclaims").as_deref(),
            Some("PersistentVolumeClaim")
        );
        assert_eq!(catalog.resolve_kind("widgets"), None);
    }

    #[test]
    fn test_malformed_declarations_are_skipped() {
        let mut catalog = RelationshipCatalog::new();
        let errors = catalog.add_declarations(
            "Widget",
            ["label, on:Pod, value:INSTANCE.spec.selector", "label", "nonsense, of:Pod"],
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(catalog.rules_for("Widget").len(), 1);
    }

    #[test]
    fn test_duplicate_rules_are_ignored() {
        let mut catalog = RelationshipCatalog::new();
        catalog.add_declarations("Widget", ["label, on:Pod", "label, of:Pod"]);
        assert_eq!(catalog.rules_for("Widget").len(), 1);
    }
}
