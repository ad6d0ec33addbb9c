//! Connection and watch streaming for kubewire
//!
//! [`Connection`] turns a resource path and a [`Scope`] into one JSON HTTP
//! exchange and maps failures to [`ClientError`]. [`WatchStream`] turns a
//! long-lived newline-delimited JSON response into a cancelable sequence of
//! raw watch events.

mod config;
mod connection;
mod error;
mod lines;
mod stream;

pub use config::{DEFAULT_BASE_URL, DEFAULT_NAMESPACE, Endpoint, Scope};
pub use connection::Connection;
pub use error::ClientError;
pub use stream::WatchStream;

// Re-export types that are used in our public API
pub use kubewire_types::{Document, RawWatchEvent, Status};
pub use tokio_util::sync::CancellationToken;
