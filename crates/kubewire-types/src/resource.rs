use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{DecodeError, Document, ObjectMeta};

// ============================================================================
// Mapper
// ============================================================================

/// A resource kind that can be decoded from a server document.
///
/// Implementors keep the source document so that equality and re-encoding are
/// lossless; the typed fields are a validated view over it.
pub trait FromObject: Sized {
    /// Value of the document's `kind` field
    const KIND: &'static str;

    fn from_object(object: Document) -> Result<Self, DecodeError>;
}

/// Decode the `items` of a list document
pub fn decode_list<K: FromObject>(mut list: Document) -> Result<Vec<K>, DecodeError> {
    match list.remove("items") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(object) => K::from_object(object),
                _ => Err(DecodeError::NotAnObject),
            })
            .collect(),
        // empty lists are sometimes encoded as null
        Some(Value::Null) => Ok(Vec::new()),
        Some(_) => Err(DecodeError::InvalidField {
            field: "items",
            source: serde::de::Error::custom("expected an array"),
        }),
        None => Err(DecodeError::MissingField("items")),
    }
}

fn check_kind(object: &Document, expected: &'static str) -> Result<(), DecodeError> {
    match object.get("kind") {
        // list items usually omit kind
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(kind)) if kind == expected => Ok(()),
        Some(Value::String(kind)) => Err(DecodeError::KindMismatch {
            expected,
            found: kind.clone(),
        }),
        Some(other) => Err(DecodeError::KindMismatch {
            expected,
            found: other.to_string(),
        }),
    }
}

fn field<T: DeserializeOwned>(object: &Document, name: &'static str) -> Result<Option<T>, DecodeError> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|source| DecodeError::InvalidField { field: name, source }),
    }
}

fn metadata(object: &Document) -> Result<ObjectMeta, DecodeError> {
    let meta: ObjectMeta =
        field(object, "metadata")?.ok_or(DecodeError::MissingField("metadata"))?;
    if meta.name.is_empty() {
        return Err(DecodeError::MissingField("metadata.name"));
    }
    Ok(meta)
}

/// Equality, serialization and document accessors for document-backed types
macro_rules! document_backed {
    ($ty:ident) => {
        impl $ty {
            pub fn name(&self) -> &str {
                &self.metadata.name
            }

            pub fn namespace(&self) -> Option<&str> {
                self.metadata.namespace.as_deref()
            }

            /// The document this value was decoded from
            pub fn as_object(&self) -> &Document {
                &self.object
            }

            pub fn into_object(self) -> Document {
                self.object
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.object == other.object
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.object.serialize(serializer)
            }
        }
    };
}

// ============================================================================
// Pod
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for PodPhase {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
    pub node_name: Option<String>,
    pub restart_policy: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub phase: PodPhase,
    #[serde(rename = "podIP")]
    pub pod_ip: Option<String>,
    #[serde(rename = "hostIP")]
    pub host_ip: Option<String>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

/// A pod as returned by the server
#[derive(Clone, Debug)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    /// Defaults to an unknown phase when the server has not reported one yet
    pub status: PodStatus,
    object: Document,
}

impl Pod {
    pub fn phase(&self) -> PodPhase {
        self.status.phase
    }

    pub fn is_pending(&self) -> bool {
        self.status.phase == PodPhase::Pending
    }
}

impl FromObject for Pod {
    const KIND: &'static str = "Pod";

    fn from_object(object: Document) -> Result<Self, DecodeError> {
        check_kind(&object, Self::KIND)?;
        Ok(Self {
            metadata: metadata(&object)?,
            spec: field(&object, "spec")?.unwrap_or_default(),
            status: field(&object, "status")?.unwrap_or_default(),
            object,
        })
    }
}

document_backed!(Pod);

// ============================================================================
// Replication controller
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationControllerSpec {
    pub replicas: Option<i32>,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationControllerStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    #[serde(default)]
    pub available_replicas: i32,
}

/// A replication controller as returned by the server
#[derive(Clone, Debug)]
pub struct ReplicationController {
    pub metadata: ObjectMeta,
    pub spec: ReplicationControllerSpec,
    pub status: ReplicationControllerStatus,
    object: Document,
}

impl ReplicationController {
    /// Desired replica count, the server defaults an omitted count to 1
    pub fn desired_replicas(&self) -> i32 {
        self.spec.replicas.unwrap_or(1)
    }

    /// Format replica status as "ready/desired"
    pub fn replica_status(&self) -> String {
        format!("{}/{}", self.status.ready_replicas, self.desired_replicas())
    }
}

impl FromObject for ReplicationController {
    const KIND: &'static str = "ReplicationController";

    fn from_object(object: Document) -> Result<Self, DecodeError> {
        check_kind(&object, Self::KIND)?;
        Ok(Self {
            metadata: metadata(&object)?,
            spec: field(&object, "spec")?.unwrap_or_default(),
            status: field(&object, "status")?.unwrap_or_default(),
            object,
        })
    }
}

document_backed!(ReplicationController);

// ============================================================================
// Namespace
// ============================================================================

#[derive(Deserialize)]
struct NamespaceStatus {
    phase: Option<String>,
}

/// A namespace object (cluster scoped)
#[derive(Clone, Debug)]
pub struct NamespaceRef {
    pub metadata: ObjectMeta,
    pub phase: Option<String>,
    object: Document,
}

impl NamespaceRef {
    pub fn status(&self) -> &str {
        self.phase.as_deref().unwrap_or("Unknown")
    }
}

impl FromObject for NamespaceRef {
    const KIND: &'static str = "Namespace";

    fn from_object(object: Document) -> Result<Self, DecodeError> {
        check_kind(&object, Self::KIND)?;
        let status: Option<NamespaceStatus> = field(&object, "status")?;
        Ok(Self {
            metadata: metadata(&object)?,
            phase: status.and_then(|s| s.phase),
            object,
        })
    }
}

document_backed!(NamespaceRef);

// ============================================================================
// Tagged resource
// ============================================================================

/// Any supported resource, selected by the document's `kind`
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Pod(Pod),
    ReplicationController(ReplicationController),
    Namespace(NamespaceRef),
}

impl Resource {
    pub fn from_object(object: Document) -> Result<Self, DecodeError> {
        let kind = match object.get("kind") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingField("kind")),
        };

        match kind.as_str() {
            "Pod" => Pod::from_object(object).map(Self::Pod),
            "ReplicationController" => {
                ReplicationController::from_object(object).map(Self::ReplicationController)
            }
            "Namespace" => NamespaceRef::from_object(object).map(Self::Namespace),
            _ => Err(DecodeError::UnsupportedKind(kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pod(_) => Pod::KIND,
            Self::ReplicationController(_) => ReplicationController::KIND,
            Self::Namespace(_) => NamespaceRef::KIND,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pod(pod) => pod.name(),
            Self::ReplicationController(rc) => rc.name(),
            Self::Namespace(ns) => ns.name(),
        }
    }

    pub fn into_object(self) -> Document {
        match self {
            Self::Pod(pod) => pod.into_object(),
            Self::ReplicationController(rc) => rc.into_object(),
            Self::Namespace(ns) => ns.into_object(),
        }
    }
}
