//! Accessors over untyped cluster objects

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One entry of `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
    pub api_version: String,
}

pub fn name(obj: &Value) -> &str {
    obj.pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

pub fn namespace(obj: &Value) -> &str {
    obj.pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

pub fn kind(obj: &Value) -> &str {
    obj.get("kind").and_then(|v| v.as_str()).unwrap_or("")
}

pub fn labels(obj: &Value) -> BTreeMap<String, String> {
    string_map(obj.pointer("/metadata/labels"))
}

pub fn annotations(obj: &Value) -> BTreeMap<String, String> {
    string_map(obj.pointer("/metadata/annotations"))
}

pub fn owner_references(obj: &Value) -> Vec<OwnerRef> {
    obj.pointer("/metadata/ownerReferences")
        .and_then(|v| v.as_array())
        .map(|refs| {
            refs.iter()
                .filter_map(|r| {
                    Some(OwnerRef {
                        kind: r.get("kind")?.as_str()?.to_string(),
                        name: r.get("name")?.as_str()?.to_string(),
                        api_version: r
                            .get("apiVersion")
                            .and_then(|v| v.as_str())
                            .unwrap_or("")
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The immediate owner, taken as the first owner reference
pub fn owner(obj: &Value) -> Option<OwnerRef> {
    owner_references(obj).into_iter().next()
}

/// Whether any owner reference points at the given kind and name
pub fn is_owned_by(obj: &Value, owner_kind: &str, owner_name: &str) -> bool {
    owner_references(obj)
        .iter()
        .any(|r| r.kind == owner_kind && r.name == owner_name)
}

pub fn status_phase(obj: &Value) -> String {
    obj.pointer("/status/phase")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Label selector of a workload or service
///
/// Reads `spec.selector.matchLabels` when present, otherwise `spec.selector`
/// as a plain string map.
pub fn selector(obj: &Value) -> BTreeMap<String, String> {
    let Some(selector) = obj.pointer("/spec/selector") else {
        return BTreeMap::new();
    };
    match selector.get("matchLabels") {
        Some(match_labels) => string_map(Some(match_labels)),
        None => string_map(Some(selector)),
    }
}

/// True when `subset` is non-empty and every pair also appears in `superset`
pub fn is_subset(subset: &BTreeMap<String, String>, superset: &BTreeMap<String, String>) -> bool {
    !subset.is_empty()
        && subset
            .iter()
            .all(|(key, value)| superset.get(key) == Some(value))
}

/// Search for the first string value stored under `field` anywhere in `value`
///
/// Descends maps and lists of maps without depth limit. Intermediate path
/// segments are not considered, only the leaf key name.
pub fn find_field_by_leaf_name(value: &Value, field: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match child {
                    Value::String(s) if key == field => return Some(s.clone()),
                    Value::Object(_) => {
                        if let Some(found) = find_field_by_leaf_name(child, field) {
                            return Some(found);
                        }
                    }
                    Value::Array(items) => {
                        for item in items {
                            match item {
                                Value::String(s) if key == field => return Some(s.clone()),
                                Value::Object(_) => {
                                    if let Some(found) = find_field_by_leaf_name(item, field) {
                                        return Some(found);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_field_by_leaf_name(item, field)),
        _ => None,
    }
}

/// Container env entries as (name, value) pairs, skipping valueFrom entries
pub fn container_env(obj: &Value) -> Vec<(String, String)> {
    let mut env = Vec::new();
    for pointer in ["/spec/containers", "/spec/initContainers"] {
        let Some(containers) = obj.pointer(pointer).and_then(|v| v.as_array()) else {
            continue;
        };
        for container in containers {
            let Some(entries) = container.get("env").and_then(|v| v.as_array()) else {
                continue;
            };
            for entry in entries {
                let name = entry.get("name").and_then(|v| v.as_str());
                let value = entry.get("value").and_then(|v| v.as_str());
                if let (Some(name), Some(value)) = (name, value) {
                    env.push((name.to_string(), value.to_string()));
                }
            }
        }
    }
    env
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
