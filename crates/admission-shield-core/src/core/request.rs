// crates/admission-shield-core/src/core/request.rs
// ============================================================================
// Module: Admission Requests
// Description: Inbound request shapes, immutable request context, and responses.
// Purpose: Capture one admission call as a snapshot that is never mutated.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`AdmissionRequest`] is the transport-neutral input of a decision call.
//! It is converted once into a [`RequestContext`], which parses the object
//! labels and exposes the borrowed [`RequestFields`] view used by rule
//! matching. [`AdmissionResponse`] is the decision boundary output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Request Enums
// ============================================================================

/// Mutation requested on a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Object creation.
    Create,
    /// Object update.
    Update,
    /// Object deletion.
    Delete,
}

impl Operation {
    /// Returns the canonical wire label of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of the requested resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceScope {
    /// Resource lives inside a namespace.
    #[default]
    Namespaced,
    /// Resource is cluster-scoped.
    Cluster,
}

impl ResourceScope {
    /// Returns the canonical label of the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespaced => "Namespaced",
            Self::Cluster => "Cluster",
        }
    }
}

// ============================================================================
// SECTION: Admission Request
// ============================================================================

/// Requester identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Requesting user name.
    #[serde(default)]
    pub username: String,
    /// Groups of the requesting user.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Inbound admission request as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Transport-assigned request identifier.
    #[serde(default)]
    pub uid: String,
    /// API group of the target resource (empty for the core group).
    #[serde(default)]
    pub api_group: String,
    /// API version of the target resource.
    pub api_version: String,
    /// Kind of the target resource.
    pub kind: String,
    /// Namespace of the target resource (empty when cluster-scoped).
    #[serde(default)]
    pub namespace: String,
    /// Name of the target resource.
    pub name: String,
    /// Requested operation.
    pub operation: Operation,
    /// Requester identity.
    #[serde(default)]
    pub user_info: UserInfo,
    /// Scope of the target resource.
    #[serde(default)]
    pub resource_scope: ResourceScope,
    /// Indicates a dry-run request.
    #[serde(default)]
    pub dry_run: bool,
    /// Raw object bytes (JSON).
    #[serde(default)]
    pub object: Vec<u8>,
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Immutable per-request snapshot used throughout one decision call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Transport-assigned request identifier.
    pub uid: String,
    /// API group of the target resource.
    pub api_group: String,
    /// API version of the target resource.
    pub api_version: String,
    /// Kind of the target resource.
    pub kind: String,
    /// Namespace of the target resource.
    pub namespace: String,
    /// Name of the target resource.
    pub name: String,
    /// Requested operation.
    pub operation: Operation,
    /// Requester identity.
    pub user_info: UserInfo,
    /// Scope of the target resource.
    pub resource_scope: ResourceScope,
    /// Indicates a dry-run request.
    pub dry_run: bool,
    /// Raw object bytes.
    pub raw_object: Vec<u8>,
    /// Parsed object, when the raw bytes are valid JSON.
    object: Option<Value>,
    /// Labels read from `metadata.labels` of the object.
    labels: BTreeMap<String, String>,
}

impl RequestContext {
    /// Builds the request context from an inbound request.
    #[must_use]
    pub fn new(request: AdmissionRequest) -> Self {
        let object: Option<Value> = if request.object.is_empty() {
            None
        } else {
            serde_json::from_slice(&request.object).ok()
        };
        let labels = object.as_ref().map(object_labels).unwrap_or_default();
        Self {
            uid: request.uid,
            api_group: request.api_group,
            api_version: request.api_version,
            kind: request.kind,
            namespace: request.namespace,
            name: request.name,
            operation: request.operation,
            user_info: request.user_info,
            resource_scope: request.resource_scope,
            dry_run: request.dry_run,
            raw_object: request.object,
            object,
            labels,
        }
    }

    /// Returns true for create requests.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.operation == Operation::Create
    }

    /// Returns true for update requests.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.operation == Operation::Update
    }

    /// Returns true for delete requests.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.operation == Operation::Delete
    }

    /// Returns `group/version`, or just the version for the core group.
    #[must_use]
    pub fn group_version(&self) -> String {
        group_version(&self.api_group, &self.api_version)
    }

    /// Returns the parsed object, if any.
    #[must_use]
    pub const fn object(&self) -> Option<&Value> {
        self.object.as_ref()
    }

    /// Returns the object labels.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Returns true when the object carries a `metadata.labels` map.
    #[must_use]
    pub fn has_label_map(&self) -> bool {
        self.object
            .as_ref()
            .and_then(|object| object.pointer("/metadata/labels"))
            .is_some_and(Value::is_object)
    }

    /// Returns the borrowed field view used for rule matching.
    #[must_use]
    pub fn fields(&self) -> RequestFields<'_> {
        RequestFields {
            api_group: &self.api_group,
            api_version: &self.api_version,
            kind: &self.kind,
            namespace: &self.namespace,
            name: &self.name,
            operation: self.operation,
            username: &self.user_info.username,
            user_groups: &self.user_info.groups,
            labels: &self.labels,
            scope: self.resource_scope,
        }
    }

    /// Returns the request snapshot recorded in profile status history.
    #[must_use]
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            api_group: self.api_group.clone(),
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            operation: self.operation,
            user_name: self.user_info.username.clone(),
        }
    }

    /// Returns a human-readable object reference for messages.
    #[must_use]
    pub fn resource_ref(&self) -> String {
        format!(
            "{}, Kind={}, Namespace={}, Name={}",
            self.group_version(),
            self.kind,
            self.namespace,
            self.name
        )
    }
}

/// Borrowed view of the request fields consulted by rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFields<'a> {
    /// API group of the target resource.
    pub api_group: &'a str,
    /// API version of the target resource.
    pub api_version: &'a str,
    /// Kind of the target resource.
    pub kind: &'a str,
    /// Namespace of the target resource.
    pub namespace: &'a str,
    /// Name of the target resource.
    pub name: &'a str,
    /// Requested operation.
    pub operation: Operation,
    /// Requesting user name.
    pub username: &'a str,
    /// Groups of the requesting user.
    pub user_groups: &'a [String],
    /// Object labels.
    pub labels: &'a BTreeMap<String, String>,
    /// Scope of the target resource.
    pub scope: ResourceScope,
}

// ============================================================================
// SECTION: Request Snapshot
// ============================================================================

/// Compact request record stored in profile status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    /// API group of the target resource.
    #[serde(default)]
    pub api_group: String,
    /// API version of the target resource.
    pub api_version: String,
    /// Kind of the target resource.
    pub kind: String,
    /// Namespace of the target resource.
    #[serde(default)]
    pub namespace: String,
    /// Name of the target resource.
    pub name: String,
    /// Requested operation.
    pub operation: Operation,
    /// Requesting user name.
    #[serde(default)]
    pub user_name: String,
}

impl RequestSnapshot {
    /// Returns the `group/version, Kind=kind` key used by status summaries.
    #[must_use]
    pub fn group_version_kind(&self) -> String {
        format!("{}, Kind={}", group_version(&self.api_group, &self.api_version), self.kind)
    }
}

// ============================================================================
// SECTION: Admission Response
// ============================================================================

/// JSON patch operation kinds emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add (or overwrite) a value.
    Add,
    /// Remove a value.
    Remove,
}

/// Single RFC 6902 patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind.
    pub op: PatchOp,
    /// JSON pointer to the target location.
    pub path: String,
    /// Value for add operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Decision boundary output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Whether the mutation is admitted.
    pub allowed: bool,
    /// Human-readable decision message.
    pub message: String,
    /// Optional JSON patch applied to admitted objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<PatchOperation>>,
}

impl AdmissionResponse {
    /// Creates a response without a patch.
    #[must_use]
    pub fn new(allowed: bool, message: impl Into<String>) -> Self {
        Self {
            allowed,
            message: message.into(),
            patch: None,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins an API group and version the way object references render them.
fn group_version(api_group: &str, api_version: &str) -> String {
    if api_group.is_empty() {
        api_version.to_string()
    } else {
        format!("{api_group}/{api_version}")
    }
}

/// Extracts string labels from `metadata.labels`.
fn object_labels(object: &Value) -> BTreeMap<String, String> {
    object
        .pointer("/metadata/labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
