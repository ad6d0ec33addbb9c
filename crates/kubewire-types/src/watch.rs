use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::FromObject;
use crate::{DecodeError, Status};

/// One line of a watch stream, before the object is mapped
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawWatchEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub object: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

impl EventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADDED" => Some(Self::Added),
            "MODIFIED" => Some(Self::Modified),
            "DELETED" => Some(Self::Deleted),
            "BOOKMARK" => Some(Self::Bookmark),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Bookmark => "BOOKMARK",
            Self::Error => "ERROR",
        }
    }
}

/// A watch event with its object mapped to a resource kind
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    /// Progress marker carrying only a resource version
    Bookmark { resource_version: Option<String> },
    /// The server reported a failure inside the stream
    Error(Status),
}

impl<K> WatchEvent<K> {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Added(_) => EventType::Added,
            Self::Modified(_) => EventType::Modified,
            Self::Deleted(_) => EventType::Deleted,
            Self::Bookmark { .. } => EventType::Bookmark,
            Self::Error(_) => EventType::Error,
        }
    }

    /// The affected resource, absent for bookmarks and errors
    pub fn object(&self) -> Option<&K> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => Some(obj),
            Self::Bookmark { .. } | Self::Error(_) => None,
        }
    }

    pub fn into_object(self) -> Option<K> {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => Some(obj),
            Self::Bookmark { .. } | Self::Error(_) => None,
        }
    }
}

impl<K: FromObject> TryFrom<RawWatchEvent> for WatchEvent<K> {
    type Error = DecodeError;

    fn try_from(raw: RawWatchEvent) -> Result<Self, DecodeError> {
        let event_type = EventType::parse(&raw.event_type)
            .ok_or_else(|| DecodeError::UnknownEventType(raw.event_type.clone()))?;

        let Value::Object(object) = raw.object else {
            return Err(DecodeError::NotAnObject);
        };

        match event_type {
            EventType::Added => K::from_object(object).map(Self::Added),
            EventType::Modified => K::from_object(object).map(Self::Modified),
            EventType::Deleted => K::from_object(object).map(Self::Deleted),
            EventType::Bookmark => {
                let resource_version = object
                    .get("metadata")
                    .and_then(|m| m.get("resourceVersion"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Self::Bookmark { resource_version })
            }
            EventType::Error => Status::deserialize(Value::Object(object))
                .map(WatchEvent::Error)
                .map_err(|source| DecodeError::InvalidField {
                    field: "object",
                    source,
                }),
        }
    }
}
