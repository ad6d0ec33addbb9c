//! Shared types for kubewire
//!
//! This crate contains the server's error document, the watch event envelope,
//! and the resource mapper that turns decoded JSON documents into typed
//! resources.

mod error;
mod meta;
mod resource;
mod status;
mod watch;

pub use error::DecodeError;
pub use meta::ObjectMeta;
pub use resource::{
    Container, ContainerStatus, FromObject, NamespaceRef, Pod, PodPhase, PodSpec, PodStatus,
    ReplicationController, ReplicationControllerSpec, ReplicationControllerStatus, Resource,
    decode_list,
};
pub use status::Status;
pub use watch::{EventType, RawWatchEvent, WatchEvent};

/// A decoded JSON object as returned by the API server
pub type Document = serde_json::Map<String, serde_json::Value>;
