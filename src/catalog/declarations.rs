//! Kind declarations from files and CRD annotations

use super::{ApiDetails, CatalogError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Annotation listing the composition children of a custom kind
pub const COMPOSITION_ANNOTATION: &str = "resource/composition";

/// Annotation prefixes carrying relationship declarations, with the relation tag they imply
pub const RELATIONSHIP_ANNOTATIONS: &[(&str, &str)] = &[
    ("resource/label-relationship", "label"),
    ("resource/specproperty-relationship", "specproperty"),
    ("resource/annotation-relationship", "annotation"),
];

/// Declaration of one kind, as found in a declarations file
///
/// ```yaml
/// - kind: Moodle
///   plural: moodles
///   endpoint: apis/moodlecontroller.kubeplus/v1
///   composition: [Deployment, Service]
///   relationships:
///     - "label, on:Pod, value:INSTANCE.spec.selector"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindDeclaration {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    /// `apis/<group>/<version>` style endpoint, alternative to group/version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_namespaced")]
    pub namespaced: bool,

    #[serde(default)]
    pub composition: Vec<String>,

    #[serde(default)]
    pub relationships: Vec<String>,
}

fn default_namespaced() -> bool {
    true
}

impl KindDeclaration {
    /// API details, when the declaration carries enough to address the kind
    pub fn api_details(&self) -> Option<ApiDetails> {
        let plural = self
            .plural
            .clone()
            .unwrap_or_else(|| format!("{}s", self.kind.to_lowercase()));

        if let Some(endpoint) = &self.endpoint {
            return Some(ApiDetails::from_endpoint(plural, endpoint, self.namespaced));
        }

        self.version.as_ref().map(|version| {
            ApiDetails::new(
                plural,
                self.group.clone().unwrap_or_default(),
                version.clone(),
                self.namespaced,
            )
        })
    }
}

/// Load a YAML list of kind declarations
pub fn load_declarations_file(path: &Path) -> Result<Vec<KindDeclaration>, CatalogError> {
    tracing::debug!("Reading kind declarations from {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&contents).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build a declaration from a CustomResourceDefinition object
///
/// Returns None for CRDs without any relationship or composition annotations.
pub fn declaration_from_crd(crd: &Value) -> Option<KindDeclaration> {
    let annotations = crd.pointer("/metadata/annotations")?.as_object()?;
    let spec = crd.get("spec")?;

    let kind = spec.pointer("/names/kind")?.as_str()?.to_string();
    let plural = spec
        .pointer("/names/plural")
        .and_then(|v| v.as_str())
        .map(String::from);
    let group = spec.get("group").and_then(|v| v.as_str()).map(String::from);
    let namespaced = spec.get("scope").and_then(|v| v.as_str()) != Some("Cluster");

    let composition: Vec<String> = annotations
        .get(COMPOSITION_ANNOTATION)
        .and_then(|v| v.as_str())
        .map(|list| {
            list.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut relationships = Vec::new();
    let mut keys: Vec<&String> = annotations.keys().collect();
    keys.sort();
    for key in keys {
        let Some(tag) = relationship_tag(key) else {
            continue;
        };
        let Some(value) = annotations.get(key).and_then(|v| v.as_str()) else {
            continue;
        };
        // Declarations may be stored with or without their leading tag
        let value = value.trim();
        if value.starts_with(tag) {
            relationships.push(value.to_string());
        } else {
            relationships.push(format!("{}, {}", tag, value));
        }
    }

    if composition.is_empty() && relationships.is_empty() {
        return None;
    }

    Some(KindDeclaration {
        kind,
        plural,
        endpoint: None,
        group,
        version: storage_version(spec),
        namespaced,
        composition,
        relationships,
    })
}

/// Relation tag for `resource/<x>-relationship` and its numbered variants
fn relationship_tag(key: &str) -> Option<&'static str> {
    RELATIONSHIP_ANNOTATIONS
        .iter()
        .find(|(prefix, _)| {
            key.strip_prefix(prefix)
                .is_some_and(|suffix| suffix.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|(_, tag)| *tag)
}

/// Storage version of a CRD, falling back to the first served version
fn storage_version(spec: &Value) -> Option<String> {
    if let Some(versions) = spec.get("versions").and_then(|v| v.as_array()) {
        let storage = versions
            .iter()
            .find(|v| v.get("storage").and_then(|s| s.as_bool()) == Some(true))
            .or_else(|| versions.first());
        if let Some(name) = storage.and_then(|v| v.get("name")).and_then(|n| n.as_str()) {
            return Some(name.to_string());
        }
    }
    spec.get("version").and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declaration_from_crd() {
        let crd = json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "CustomResourceDefinition",
            "metadata": {
                "name": "moodles.moodlecontroller.kubeplus",
                "annotations": {
                    "resource/composition": "Deployment, Service, PersistentVolumeClaim",
                    "resource/label-relationship": "on:Pod, value:INSTANCE.spec.selector",
                    "resource/annotation-relationship1": "annotation, on:Service, key:moodle/owner, value:INSTANCE.metadata.name",
                    "resource/usage": "moodle-usage"
                }
            },
            "spec": {
                "group": "moodlecontroller.kubeplus",
                "scope": "Namespaced",
                "names": {"kind": "Moodle", "plural": "moodles"},
                "versions": [
                    {"name": "v1alpha1", "served": true, "storage": false},
                    {"name": "v1", "served": true, "storage": true}
                ]
            }
        });

        let declaration = declaration_from_crd(&crd).unwrap();
        assert_eq!(declaration.kind, "Moodle");
        assert_eq!(
            declaration.composition,
            vec!["Deployment", "Service", "PersistentVolumeClaim"]
        );
        assert_eq!(declaration.relationships.len(), 2);
        assert!(declaration.relationships[0].starts_with("annotation"));
        assert_eq!(
            declaration.relationships[1],
            "label, on:Pod, value:INSTANCE.spec.selector"
        );

        let details = declaration.api_details().unwrap();
        assert_eq!(details.api_version(), "moodlecontroller.kubeplus/v1");
        assert_eq!(details.plural, "moodles");
        assert!(details.namespaced);
    }

    #[test]
    fn test_crd_without_annotations_is_ignored() {
        let crd = json!({
            "metadata": {"name": "widgets.example.com", "annotations": {"other": "x"}},
            "spec": {"group": "example.com", "names": {"kind": "Widget", "plural": "widgets"}}
        });
        assert!(declaration_from_crd(&crd).is_none());
    }

    #[test]
    fn test_relationship_tag() {
        assert_eq!(relationship_tag("resource/label-relationship"), Some("label"));
        assert_eq!(
            relationship_tag("resource/specproperty-relationship12"),
            Some("specproperty")
        );
        assert_eq!(relationship_tag("resource/label-relationships"), None);
        assert_eq!(relationship_tag("resource/composition"), None);
    }

    #[test]
    fn test_declaration_from_yaml() {
        let yaml = r#"
- kind: Moodle
  plural: moodles
  endpoint: apis/moodlecontroller.kubeplus/v1
  composition: [Deployment, Service]
- kind: Widget
  group: example.com
  version: v1beta1
  namespaced: false
  relationships:
    - "owner reference, of:Pod"
"#;
        let declarations: Vec<KindDeclaration> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[0].composition, vec!["Deployment", "Service"]);
        let widget = declarations[1].api_details().unwrap();
        assert_eq!(widget.plural, "widgets");
        assert_eq!(widget.api_version(), "example.com/v1beta1");
        assert!(!widget.namespaced);
    }
}
