//! Relationship declarations read from installed CRDs

use crate::catalog::{KindDeclaration, declaration_from_crd};
use anyhow::{Context, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Api;
use kube::api::ListParams;

/// List CRDs and extract the declarations carried in their annotations
pub async fn fetch_crd_declarations(client: &kube::Client) -> Result<Vec<KindDeclaration>> {
    let api: Api<CustomResourceDefinition> = Api::all(client.clone());
    let crds = api
        .list(&ListParams::default())
        .await
        .context("Failed to list CustomResourceDefinitions")?;

    let mut declarations = Vec::new();
    for crd in &crds.items {
        let value = match serde_json::to_value(crd) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read CRD {:?}: {}", crd.metadata.name, e);
                continue;
            }
        };
        if let Some(declaration) = declaration_from_crd(&value) {
            tracing::debug!(
                "CRD {} declares {} relationship(s) and composition {:?}",
                declaration.kind,
                declaration.relationships.len(),
                declaration.composition
            );
            declarations.push(declaration);
        }
    }

    Ok(declarations)
}
