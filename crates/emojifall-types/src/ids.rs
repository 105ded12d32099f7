//! Opaque identifier for a dropper (a participant who submits drops).
//!
//! Dropper ids are minted by the upstream session store when a visitor
//! signs up, so on the wire they are plain strings. The newtype prevents
//! accidental mixing with emoji text or pseudonyms at compile time.
//! Locally generated ids (seed data, tests) use UUID v7 (time-ordered)
//! in text form.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Identity reference carried by every drop submission.
///
/// The value is opaque to this system: it is resolved to a display
/// identity through the dropper directory and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(transparent)]
pub struct DropperId(String);

impl DropperId {
    /// Create a freshly generated identifier using UUID v7 (time-ordered).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for DropperId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DropperId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl core::fmt::Display for DropperId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
