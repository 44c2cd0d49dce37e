//! Dynamic resource fetching
//!
//! Resolves kinds to `ApiResource`s through the relationship catalog and reads
//! objects with `Api<DynamicObject>`, so any declared kind (built-in or
//! custom) can be fetched without a typed binding.

use crate::catalog::{ApiDetails, RelationshipCatalog};
use crate::cluster::{ClusterClient, ClusterError};
use async_trait::async_trait;
use kube::Api;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use serde_json::Value;
use std::sync::Arc;

/// Live cluster access through the Kubernetes API
pub struct KubeCluster {
    client: kube::Client,
    catalog: Arc<RelationshipCatalog>,
}

impl KubeCluster {
    pub fn new(client: kube::Client, catalog: Arc<RelationshipCatalog>) -> Self {
        Self { client, catalog }
    }

    fn api_resource(&self, kind: &str) -> Result<(ApiResource, bool), ClusterError> {
        let details = self
            .catalog
            .api_details(kind)
            .ok_or_else(|| ClusterError::UnknownKind(kind.to_string()))?;
        Ok((to_api_resource(kind, details), details.namespaced))
    }

    fn request_error(kind: &str, source: kube::Error) -> ClusterError {
        ClusterError::Request {
            kind: kind.to_string(),
            source,
        }
    }
}

/// Build an ApiResource from catalog details
pub fn to_api_resource(kind: &str, details: &ApiDetails) -> ApiResource {
    let gvk = GroupVersionKind::gvk(&details.group, &details.version, kind);
    ApiResource::from_gvk_with_plural(&gvk, &details.plural)
}

fn to_value(kind: &str, obj: &DynamicObject, api_version: &str) -> Result<Value, ClusterError> {
    let mut value = serde_json::to_value(obj).map_err(|e| ClusterError::Unavailable {
        kind: kind.to_string(),
        reason: format!("failed to serialize object: {}", e),
    })?;

    // List items come back without type metadata
    if let Some(map) = value.as_object_mut() {
        map.entry("kind").or_insert_with(|| Value::from(kind));
        map.entry("apiVersion")
            .or_insert_with(|| Value::from(api_version));
    }
    Ok(value)
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn get_object(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Value>, ClusterError> {
        let (api_resource, namespaced) = self.api_resource(kind)?;
        let mut namespaced_error = None;

        if namespaced && !namespace.is_empty() {
            let api: Api<DynamicObject> =
                Api::namespaced_with(self.client.clone(), namespace, &api_resource);
            match api.get_opt(name).await {
                Ok(Some(obj)) => return to_value(kind, &obj, &api_resource.api_version).map(Some),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        "Namespaced get of {}/{} in {} failed, trying cluster scope: {}",
                        kind,
                        name,
                        namespace,
                        e
                    );
                    namespaced_error = Some(e);
                }
            }
        }

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &api_resource);
        match (api.get_opt(name).await, namespaced_error) {
            (Ok(Some(obj)), _) => to_value(kind, &obj, &api_resource.api_version).map(Some),
            (Ok(None), None) => Ok(None),
            // Absent cluster-wide, so the namespaced failure is the real answer
            (Ok(None), Some(e)) => Err(Self::request_error(kind, e)),
            // A namespaced kind cannot be fetched cluster-wide by name
            (Err(_), None) if namespaced => Ok(None),
            (Err(_), Some(e)) => Err(Self::request_error(kind, e)),
            (Err(e), None) => Err(Self::request_error(kind, e)),
        }
    }

    async fn list_objects(&self, kind: &str, namespace: &str) -> Result<Vec<Value>, ClusterError> {
        let (api_resource, namespaced) = self.api_resource(kind)?;
        let params = ListParams::default();

        if namespaced && !namespace.is_empty() {
            let api: Api<DynamicObject> =
                Api::namespaced_with(self.client.clone(), namespace, &api_resource);
            match api.list(&params).await {
                Ok(list) => {
                    return list
                        .items
                        .iter()
                        .map(|obj| to_value(kind, obj, &api_resource.api_version))
                        .collect();
                }
                Err(e) => {
                    tracing::debug!(
                        "Namespaced list of {} in {} failed, trying cluster scope: {}",
                        kind,
                        namespace,
                        e
                    );
                }
            }
        }

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &api_resource);
        let list = api
            .list(&params)
            .await
            .map_err(|e| Self::request_error(kind, e))?;
        list.items
            .iter()
            .map(|obj| to_value(kind, obj, &api_resource.api_version))
            .collect()
    }
}
