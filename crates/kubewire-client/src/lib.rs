//! Typed resource client for kubewire
//!
//! [`Client`] composes the connection, the watch stream and the resource
//! mapper into one method per resource kind and operation.

mod client;
mod logs;
mod watch;

pub use client::Client;
pub use logs::LogOptions;
pub use watch::WatchEvents;

pub use kubewire_http::{
    CancellationToken, ClientError, Connection, DEFAULT_BASE_URL, DEFAULT_NAMESPACE, Document,
    Endpoint, Scope, WatchStream,
};
pub use kubewire_types::{
    DecodeError, EventType, FromObject, NamespaceRef, ObjectMeta, Pod, PodPhase,
    ReplicationController, Resource, Status, WatchEvent,
};
