//! Wire-level event types for the drop pipeline.
//!
//! Field names follow the JSON contract consumed by the browser client
//! (`camelCase`), so every type here carries a serde rename attribute and
//! exports a `TypeScript` binding via `ts-rs`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::DropperId;

/// Bus topic that drop events are published under.
pub const TOPIC_DROP: &str = "drop";

/// Name of the server-sent event delivered to viewers.
pub const EVENT_NEW_EMOJI_DROP: &str = "new-emoji-drop";

/// One emoji drop as submitted by a participant.
///
/// Transient: exists for the duration of a single publish/deliver cycle
/// and is never stored by this system. Persistence happens upstream,
/// before the ingest endpoint is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct DropEvent {
    /// The emoji being dropped.
    pub emoji: String,
    /// Identity reference of the submitting participant.
    pub dropped_by: DropperId,
    /// Device model reported by the submitting phone's user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ua_device_model: Option<String>,
    /// Device vendor reported by the submitting phone's user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ua_device_vendor: Option<String>,
}

/// Display identity of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Dropper {
    /// The participant's opaque id.
    pub id: DropperId,
    /// The avatar emoji chosen at signup.
    pub emoji: String,
    /// The pseudonym assigned at signup.
    pub pseudonym: String,
}

/// A drop event after identity resolution, as delivered to viewers.
///
/// `dropper` is `None` (JSON `null`) when the id is unknown or the lookup
/// failed. That is a valid degraded state, not an error: the emoji still
/// drops, it just falls anonymously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct EnrichedDropEvent {
    /// The emoji being dropped.
    pub emoji: String,
    /// Device model reported by the submitting phone's user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ua_device_model: Option<String>,
    /// Device vendor reported by the submitting phone's user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ua_device_vendor: Option<String>,
    /// Resolved display identity, or `None` if resolution failed.
    pub dropper: Option<Dropper>,
}

impl EnrichedDropEvent {
    /// Build an enriched event from a raw drop and an optional resolved
    /// identity.
    pub fn from_drop(event: DropEvent, dropper: Option<Dropper>) -> Self {
        Self {
            emoji: event.emoji,
            ua_device_model: event.ua_device_model,
            ua_device_vendor: event.ua_device_vendor,
            dropper,
        }
    }
}

/// Batch envelope accepted by the ingest endpoint.
///
/// Mirrors the change-feed shape produced by the upstream submission
/// collaborator: a count plus the payload items. The count is advisory;
/// the actual payload length wins when they disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeed {
    /// Number of items the sender claims to have included.
    pub length: usize,
    /// The drop payloads.
    pub payload: Vec<DropEvent>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn drop_event_uses_camel_case_keys() {
        let event = DropEvent {
            emoji: String::from("🦀"),
            dropped_by: DropperId::from("user-1"),
            ua_device_model: Some(String::from("Pixel 8")),
            ua_device_vendor: Some(String::from("Google")),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["emoji"], "🦀");
        assert_eq!(json["droppedBy"], "user-1");
        assert_eq!(json["uaDeviceModel"], "Pixel 8");
        assert_eq!(json["uaDeviceVendor"], "Google");
    }

    #[test]
    fn absent_ua_fields_are_omitted() {
        let event = DropEvent {
            emoji: String::from("🎉"),
            dropped_by: DropperId::from("user-2"),
            ua_device_model: None,
            ua_device_vendor: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("uaDeviceModel").is_none());
        assert!(json.get("uaDeviceVendor").is_none());
    }

    #[test]
    fn unresolved_dropper_serializes_as_null() {
        let enriched = EnrichedDropEvent {
            emoji: String::from("🎈"),
            ua_device_model: None,
            ua_device_vendor: None,
            dropper: None,
        };
        let json = serde_json::to_value(&enriched).unwrap();
        assert!(json["dropper"].is_null());
    }

    #[test]
    fn from_drop_carries_fields_through() {
        let event = DropEvent {
            emoji: String::from("🐙"),
            dropped_by: DropperId::from("user-3"),
            ua_device_model: Some(String::from("iPhone 15")),
            ua_device_vendor: Some(String::from("Apple")),
        };
        let dropper = Dropper {
            id: DropperId::from("user-3"),
            emoji: String::from("🐳"),
            pseudonym: String::from("Abyssal Cephalopod"),
        };
        let enriched = EnrichedDropEvent::from_drop(event, Some(dropper));
        assert_eq!(enriched.emoji, "🐙");
        assert_eq!(enriched.ua_device_vendor.as_deref(), Some("Apple"));
        let resolved = enriched.dropper.unwrap();
        assert_eq!(resolved.pseudonym, "Abyssal Cephalopod");
    }

    #[test]
    fn change_feed_deserializes_from_wire_shape() {
        let raw = r#"{
            "length": 1,
            "payload": [
                { "emoji": "🖖", "droppedBy": "user-4" }
            ]
        }"#;
        let feed: ChangeFeed = serde_json::from_str(raw).unwrap();
        assert_eq!(feed.length, 1);
        assert_eq!(feed.payload.len(), 1);
        let first = feed.payload.first().unwrap();
        assert_eq!(first.emoji, "🖖");
        assert!(first.ua_device_model.is_none());
    }
}
