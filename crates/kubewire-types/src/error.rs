use thiserror::Error;

/// Failure to map a JSON document onto a typed resource
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("expected kind `{expected}`, found `{found}`")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("unsupported kind `{0}`")]
    UnsupportedKind(String),

    #[error("unknown watch event type `{0}`")]
    UnknownEventType(String),
}
