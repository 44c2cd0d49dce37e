//! Snapshot tests for rendered output
//!
//! Captures the tree, flat, branches and JSON renderings of a connection
//! graph, and the text rendering of a composition tree.
//! Run `cargo insta review` to review and accept snapshot changes.

use insta::assert_snapshot;
use kubediscovery::graph::{ConnectionWalker, render};
use kubediscovery::{
    ClusterClient, ConnectionGraph, DiscoveryService, InMemoryCluster, OutputFormat,
    RelationshipCatalog, TraversalSettings,
};
use serde_json::json;
use std::sync::Arc;

fn cluster() -> InMemoryCluster {
    InMemoryCluster::with_objects(vec![
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default"}
        }),
        json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "web-abc",
                "namespace": "default",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "Deployment", "name": "web"}]
            },
            "status": {"phase": "Running"}
        }),
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-abc-1",
                "namespace": "default",
                "labels": {"app": "web"},
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "web-abc"}]
            },
            "status": {"phase": "Running"}
        }),
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {"selector": {"app": "web"}}
        }),
    ])
}

async fn web_graph() -> ConnectionGraph {
    let catalog = RelationshipCatalog::builtin();
    let cluster = cluster();
    ConnectionWalker::new(&catalog, &cluster)
        .discover("Deployment", "web", "default")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_tree_output() {
    let graph = web_graph().await;
    let rendered = render(&graph, OutputFormat::Tree).unwrap();
    assert_snapshot!(rendered.trim_end(), @r"
    Deployment/web
      ReplicaSet/web-abc [owner-reference]
        Pod/web-abc-1 [owner-reference]
          Service/web [label: app:web]
    ");
}

#[tokio::test]
async fn test_flat_output() {
    let graph = web_graph().await;
    let rendered = render(&graph, OutputFormat::Flat).unwrap();
    assert_snapshot!(rendered.trim_end(), @r"
    Level:0 Deployment/web (default)
    Level:1 ReplicaSet/web-abc (default) [owner-reference] peer:Deployment/web owner:Deployment/web
    Level:2 Pod/web-abc-1 (default) [owner-reference] peer:ReplicaSet/web-abc owner:ReplicaSet/web-abc
    Level:3 Service/web (default) [label: app:web] peer:Pod/web-abc-1
    ");
}

#[tokio::test]
async fn test_branches_output() {
    let graph = web_graph().await;
    let rendered = render(&graph, OutputFormat::Branches).unwrap();
    assert_snapshot!(rendered.trim_end(), @r"
    Branch 1: Deployment/web
      Level:1 ReplicaSet/web-abc (default) [owner-reference] peer:Deployment/web owner:Deployment/web
      Level:2 Pod/web-abc-1 (default) [owner-reference] peer:ReplicaSet/web-abc owner:ReplicaSet/web-abc
      Level:3 Service/web (default) [label: app:web] peer:Pod/web-abc-1
    ");
}

#[tokio::test]
async fn test_json_output() {
    let graph = web_graph().await;
    let rendered = render(&graph, OutputFormat::Json).unwrap();
    assert_snapshot!(rendered, @r#"
    [
      {
        "level": 0,
        "kind": "Deployment",
        "name": "web",
        "namespace": "default"
      },
      {
        "level": 1,
        "kind": "ReplicaSet",
        "name": "web-abc",
        "namespace": "default",
        "relationType": "owner-reference",
        "peerKind": "Deployment",
        "peerName": "web",
        "peerNamespace": "default",
        "ownerKind": "Deployment",
        "ownerName": "web"
      },
      {
        "level": 2,
        "kind": "Pod",
        "name": "web-abc-1",
        "namespace": "default",
        "relationType": "owner-reference",
        "peerKind": "ReplicaSet",
        "peerName": "web-abc",
        "peerNamespace": "default",
        "ownerKind": "ReplicaSet",
        "ownerName": "web-abc"
      },
      {
        "level": 3,
        "kind": "Service",
        "name": "web",
        "namespace": "default",
        "relationType": "label",
        "relationDetails": "app:web",
        "peerKind": "Pod",
        "peerName": "web-abc-1",
        "peerNamespace": "default"
      }
    ]
    "#);
}

/// Service `svc` selects `p1` and `p2`; `p1` belongs to `rs1`, which belongs to `d1`
async fn fan_out_graph() -> ConnectionGraph {
    let cluster = InMemoryCluster::with_objects(vec![
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "svc", "namespace": "default"},
            "spec": {"selector": {"app": "x"}}
        }),
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "p1",
                "namespace": "default",
                "labels": {"app": "x"},
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "rs1"}]
            }
        }),
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "p2", "namespace": "default", "labels": {"app": "x"}}
        }),
        json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "rs1",
                "namespace": "default",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "Deployment", "name": "d1"}]
            }
        }),
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "d1", "namespace": "default"}
        }),
    ]);
    let catalog = RelationshipCatalog::builtin();
    ConnectionWalker::new(&catalog, &cluster)
        .discover("Service", "svc", "default")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fan_out_tree_output() {
    let graph = fan_out_graph().await;
    let rendered = render(&graph, OutputFormat::Tree).unwrap();
    assert_snapshot!(rendered.trim_end(), @r"
    Service/svc
      Pod/p1 [label: app:x]
        ReplicaSet/rs1 [owner-reference]
          Deployment/d1 [owner-reference]
      Pod/p2 [label: app:x]
    ");
}

#[tokio::test]
async fn test_fan_out_branches_output() {
    let graph = fan_out_graph().await;
    let rendered = render(&graph, OutputFormat::Branches).unwrap();
    assert_snapshot!(rendered.trim_end(), @r"
    Branch 1: Service/svc
      Level:1 Pod/p1 (default) [label: app:x] peer:Service/svc owner:ReplicaSet/rs1
      Level:2 ReplicaSet/rs1 (default) [owner-reference] peer:Pod/p1 owner:Deployment/d1
      Level:3 Deployment/d1 (default) [owner-reference] peer:ReplicaSet/rs1
    Branch 2: Service/svc
      Level:1 Pod/p2 (default) [label: app:x] peer:Service/svc
    ");
}

#[tokio::test]
async fn test_composition_tree_output() {
    let cluster: Arc<dyn ClusterClient> = Arc::new(cluster());
    let service = DiscoveryService::new(
        Arc::new(RelationshipCatalog::builtin()),
        cluster,
        TraversalSettings::default(),
    );
    service.build_composition_tree("default").await;

    let rendered: String = service
        .get_compositions("Deployment", "*", "default")
        .unwrap()
        .iter()
        .map(|c| c.render_tree())
        .collect();
    assert_snapshot!(rendered.trim_end(), @r"
    Deployment/web
      ReplicaSet/web-abc (Running)
        Pod/web-abc-1 (Running)
    ");
}

#[test]
fn test_output_format_names() {
    for format in [
        OutputFormat::Flat,
        OutputFormat::Branches,
        OutputFormat::Tree,
        OutputFormat::Json,
    ] {
        assert_eq!(OutputFormat::parse(format.as_str()), Some(format));
    }
    assert_eq!(OutputFormat::parse(" TREE "), Some(OutputFormat::Tree));
    assert_eq!(OutputFormat::parse("yaml"), None);
    assert_eq!(OutputFormat::default(), OutputFormat::Tree);
}
