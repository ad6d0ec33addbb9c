use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The server's structured error payload.
///
/// Returned in the body of every non-success response. `reason` is the
/// machine readable category (e.g. `NotFound`) callers branch on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// "Success" or "Failure"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,

    /// HTTP-equivalent status code, 0 when the server omitted it
    #[serde(default)]
    pub code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Status {
    pub fn is_not_found(&self) -> bool {
        self.reason == "NotFound"
    }

    pub fn is_already_exists(&self) -> bool {
        self.reason == "AlreadyExists"
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reason.is_empty(), self.message.is_empty()) {
            (false, false) => write!(f, "{}: {} ({})", self.reason, self.message, self.code),
            (false, true) => write!(f, "{} ({})", self.reason, self.code),
            (true, false) => write!(f, "{} ({})", self.message, self.code),
            (true, true) => write!(f, "request failed ({})", self.code),
        }
    }
}
