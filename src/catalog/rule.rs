//! Relationship rule parsing
//!
//! A rule is declared as a comma-separated string. The first token names the
//! relation kind; the remaining tokens are `key:value` pairs:
//!
//! ```text
//! label, on:Pod, value:INSTANCE.spec.selector
//! specproperty, on:INSTANCE.spec.volumeName, value:PersistentVolume.metadata.name
//! annotation, on:Service, key:app.example.com/owner, value:INSTANCE.metadata.name
//! owner reference, of:ReplicaSet, value:INSTANCE.name
//! ```
//!
//! Dotted paths are reduced to their last segment. Matching later searches for
//! that leaf name anywhere in the object instead of navigating the full path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How one kind relates to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    Label,
    SpecProperty,
    EnvironmentVariable,
    Annotation,
    OwnerReference,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::Label,
        RelationKind::SpecProperty,
        RelationKind::EnvironmentVariable,
        RelationKind::Annotation,
        RelationKind::OwnerReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Label => "label",
            RelationKind::SpecProperty => "spec-property",
            RelationKind::EnvironmentVariable => "environment-variable",
            RelationKind::Annotation => "annotation",
            RelationKind::OwnerReference => "owner-reference",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = RuleParseError;

    /// Accepts both the hyphenated names and the legacy spellings
    /// (`specproperty`, `envvariable`, `owner reference`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "label" => Ok(RelationKind::Label),
            "specproperty" => Ok(RelationKind::SpecProperty),
            "envvariable" | "environmentvariable" | "env" => Ok(RelationKind::EnvironmentVariable),
            "annotation" => Ok(RelationKind::Annotation),
            "ownerreference" | "owner" => Ok(RelationKind::OwnerReference),
            _ => Err(RuleParseError::UnknownRelation(s.trim().to_string())),
        }
    }
}

/// Errors raised while parsing a relationship declaration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleParseError {
    #[error("relationship declaration is empty")]
    Empty,

    #[error("unknown relation kind '{0}'")]
    UnknownRelation(String),

    #[error("token '{0}' is not of the form key:value")]
    MalformedToken(String),

    #[error("{relation} relationship is missing '{key}'")]
    MissingKey {
        relation: RelationKind,
        key: &'static str,
    },
}

/// A parsed relationship declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRule {
    pub relation: RelationKind,
    /// Kind on the other end of the relationship
    pub target_kind: String,
    /// Leaf field name searched on the source object (spec-property, env),
    /// annotation key (annotation) or selector path (label)
    pub source_field: Option<String>,
    /// Field on the target compared against; only `name` is supported
    pub target_field: Option<String>,
    /// Raw `value:` token, kept for detail strings
    pub value_pattern: Option<String>,
    /// The declaration this rule was parsed from
    #[serde(skip)]
    pub declaration: String,
}

impl RelationshipRule {
    /// Parse a single declaration string
    pub fn parse(declaration: &str) -> Result<Self, RuleParseError> {
        let mut tokens = declaration.split(',').map(str::trim);
        let tag = tokens.next().filter(|t| !t.is_empty()).ok_or(RuleParseError::Empty)?;
        let relation: RelationKind = tag.parse()?;

        let mut pairs: HashMap<String, String> = HashMap::new();
        for token in tokens.filter(|t| !t.is_empty()) {
            let (key, value) = token
                .split_once(':')
                .ok_or_else(|| RuleParseError::MalformedToken(token.to_string()))?;
            let (key, value) = (key.trim().to_lowercase(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(RuleParseError::MalformedToken(token.to_string()));
            }
            pairs.insert(key, value.to_string());
        }

        let required = |key: &'static str| -> Result<String, RuleParseError> {
            pairs
                .get(key)
                .cloned()
                .ok_or(RuleParseError::MissingKey { relation, key })
        };
        // `of:` and `on:` are used interchangeably for the target kind
        let target = || -> Result<String, RuleParseError> {
            pairs
                .get("of")
                .or_else(|| pairs.get("on"))
                .cloned()
                .ok_or(RuleParseError::MissingKey {
                    relation,
                    key: "of",
                })
        };

        let rule = match relation {
            RelationKind::Label => RelationshipRule {
                relation,
                target_kind: target()?,
                source_field: pairs.get("value").cloned(),
                target_field: None,
                value_pattern: pairs.get("value").cloned(),
                declaration: declaration.trim().to_string(),
            },
            RelationKind::SpecProperty | RelationKind::EnvironmentVariable => {
                let source_path = required("on")?;
                let value = required("value")?;
                let source_leaf = last_segment(&source_path);
                let target_kind = first_segment(&value);
                let target_field = last_segment(&value);

                // An env leaf always selects the env-variable strategy
                let relation = if source_leaf == "env" {
                    RelationKind::EnvironmentVariable
                } else {
                    relation
                };

                RelationshipRule {
                    relation,
                    target_kind,
                    source_field: Some(source_leaf),
                    target_field: Some(target_field),
                    value_pattern: Some(value),
                    declaration: declaration.trim().to_string(),
                }
            }
            RelationKind::Annotation => {
                let key = required("key")?;
                let value = required("value")?;
                RelationshipRule {
                    relation,
                    target_kind: target()?,
                    source_field: Some(key),
                    target_field: Some(last_segment(&value)),
                    value_pattern: Some(value),
                    declaration: declaration.trim().to_string(),
                }
            }
            RelationKind::OwnerReference => RelationshipRule {
                relation,
                target_kind: target()?,
                source_field: None,
                target_field: None,
                value_pattern: pairs.get("value").cloned(),
                declaration: declaration.trim().to_string(),
            },
        };

        Ok(rule)
    }

    /// Leaf field searched on the source object
    pub fn source_leaf(&self) -> Option<&str> {
        self.source_field.as_deref()
    }

    /// Target field compared for equality, `name` when unspecified
    pub fn target_leaf(&self) -> &str {
        self.target_field.as_deref().unwrap_or("name")
    }

    /// Annotation key for annotation rules
    pub fn annotation_key(&self) -> Option<&str> {
        match self.relation {
            RelationKind::Annotation => self.source_field.as_deref(),
            _ => None,
        }
    }
}

impl FromStr for RelationshipRule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipRule::parse(s)
    }
}

fn last_segment(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).trim().to_string()
}

fn first_segment(path: &str) -> String {
    path.split('.').next().unwrap_or(path).trim().to_string()
}
