//! Built-in kind declarations
//!
//! Covers the core workload, networking and storage kinds. To teach the
//! catalog a new built-in kind, add an entry to BUILTIN_KINDS below.

/// Static declaration of a built-in kind
pub struct BuiltinKind {
    pub kind: &'static str,
    pub plural: &'static str,
    pub group: &'static str,
    pub version: &'static str,
    pub namespaced: bool,
    pub composition: &'static [&'static str],
    pub relationships: &'static [&'static str],
}

pub const BUILTIN_KINDS: &[BuiltinKind] = &[
    // Workloads
    BuiltinKind {
        kind: "Deployment",
        plural: "deployments",
        group: "apps",
        version: "v1",
        namespaced: true,
        composition: &["ReplicaSet"],
        relationships: &["owner reference, of:ReplicaSet, value:INSTANCE.name"],
    },
    BuiltinKind {
        kind: "ReplicaSet",
        plural: "replicasets",
        group: "apps",
        version: "v1",
        namespaced: true,
        composition: &["Pod"],
        relationships: &["owner reference, of:Pod, value:INSTANCE.name"],
    },
    BuiltinKind {
        kind: "StatefulSet",
        plural: "statefulsets",
        group: "apps",
        version: "v1",
        namespaced: true,
        composition: &["Pod", "ReplicaSet"],
        relationships: &[
            "owner reference, of:ReplicaSet, value:INSTANCE.name",
            "owner reference, of:Pod, value:INSTANCE.name",
        ],
    },
    BuiltinKind {
        kind: "DaemonSet",
        plural: "daemonsets",
        group: "apps",
        version: "v1",
        namespaced: true,
        composition: &["Pod"],
        relationships: &[],
    },
    BuiltinKind {
        kind: "ReplicationController",
        plural: "replicationcontrollers",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &["Pod"],
        relationships: &[],
    },
    BuiltinKind {
        kind: "PodDisruptionBudget",
        plural: "poddisruptionbudgets",
        group: "policy",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[],
    },
    BuiltinKind {
        kind: "Pod",
        plural: "pods",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[
            "specproperty, on:INSTANCE.spec.containers.env, value:Service.spec.metadata.name",
            "specproperty, on:INSTANCE.spec.volumes.persistentVolumeClaim.claimName, value:PersistentVolumeClaim.metadata.name",
            "specproperty, on:INSTANCE.spec.serviceAccountName, value:ServiceAccount.metadata.name",
            "specproperty, on:INSTANCE.metadata.namespace, value:Namespace.metadata.name",
        ],
    },
    // Identity and configuration
    BuiltinKind {
        kind: "ServiceAccount",
        plural: "serviceaccounts",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[],
    },
    BuiltinKind {
        kind: "Namespace",
        plural: "namespaces",
        group: "",
        version: "v1",
        namespaced: false,
        composition: &[],
        relationships: &[],
    },
    BuiltinKind {
        kind: "ConfigMap",
        plural: "configmaps",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[],
    },
    BuiltinKind {
        kind: "Secret",
        plural: "secrets",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[],
    },
    // Networking
    BuiltinKind {
        kind: "Service",
        plural: "services",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &["label, on:Pod, value:INSTANCE.spec.selector"],
    },
    BuiltinKind {
        kind: "Ingress",
        plural: "ingresses",
        group: "networking.k8s.io",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[
            "specproperty, on:INSTANCE.spec.rules.http.paths.backend.serviceName, value:Service.spec.metadata.name",
        ],
    },
    // Storage
    BuiltinKind {
        kind: "PersistentVolumeClaim",
        plural: "persistentvolumeclaims",
        group: "",
        version: "v1",
        namespaced: true,
        composition: &[],
        relationships: &[
            "specproperty, on:INSTANCE.spec.volumeName, value:PersistentVolume.metadata.name",
        ],
    },
    BuiltinKind {
        kind: "PersistentVolume",
        plural: "persistentvolumes",
        group: "",
        version: "v1",
        namespaced: false,
        composition: &[],
        relationships: &[],
    },
];
