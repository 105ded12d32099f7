//! Dropper identity directory for the Emojifall drop pipeline.
//!
//! The directory answers one question for the stream layer: given the
//! opaque id carried by a drop event, what display identity (avatar emoji
//! plus pseudonym) should viewers see? In the full deployment identities
//! are minted by the signup flow and persisted relationally; this crate
//! models that collaborator as an in-memory async store so the fan-out
//! core stays independent of the persistence stack.
//!
//! Lookup of an unknown id returns `None` -- a valid degraded state the
//! stream layer renders as an anonymous drop, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use emojifall_types::{Dropper, DropperId};
use tokio::sync::RwLock;
use tracing::debug;

/// Errors that can occur when registering droppers.
///
/// Lookups are infallible; only writes validate.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// A required display field was empty or whitespace-only.
    #[error("dropper field must not be blank: {field}")]
    BlankField {
        /// Name of the offending field (`emoji` or `pseudonym`).
        field: &'static str,
    },

    /// A dropper with the same id is already registered.
    #[error("duplicate dropper id: {0}")]
    DuplicateId(DropperId),
}

/// One registered identity plus bookkeeping.
#[derive(Debug, Clone)]
struct DropperRecord {
    dropper: Dropper,
    registered_at: DateTime<Utc>,
}

/// In-memory async store mapping dropper ids to display identities.
///
/// Shared across request handlers behind an `Arc`; reads vastly outnumber
/// writes (every delivered event resolves an identity, registrations only
/// happen at seeding time), so the map sits behind a read-write lock.
#[derive(Debug, Default)]
pub struct DropperDirectory {
    records: RwLock<BTreeMap<DropperId, DropperRecord>>,
}

impl DropperDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dropper identity.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::BlankField`] if the emoji or pseudonym is
    /// blank, or [`DirectoryError::DuplicateId`] if the id is already
    /// registered.
    pub async fn register(&self, dropper: Dropper) -> Result<(), DirectoryError> {
        if dropper.emoji.trim().is_empty() {
            return Err(DirectoryError::BlankField { field: "emoji" });
        }
        if dropper.pseudonym.trim().is_empty() {
            return Err(DirectoryError::BlankField { field: "pseudonym" });
        }

        let mut records = self.records.write().await;
        if records.contains_key(&dropper.id) {
            return Err(DirectoryError::DuplicateId(dropper.id));
        }

        debug!(id = %dropper.id, pseudonym = dropper.pseudonym, "dropper registered");
        records.insert(
            dropper.id.clone(),
            DropperRecord {
                dropper,
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Register a dropper under a freshly generated id and return the id.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::BlankField`] if the emoji or pseudonym is
    /// blank.
    pub async fn register_generated(
        &self,
        emoji: &str,
        pseudonym: &str,
    ) -> Result<DropperId, DirectoryError> {
        let id = DropperId::generate();
        self.register(Dropper {
            id: id.clone(),
            emoji: emoji.to_owned(),
            pseudonym: pseudonym.to_owned(),
        })
        .await?;
        Ok(id)
    }

    /// Resolve a dropper id to its display identity.
    ///
    /// Returns `None` for unknown ids. This is the async external-lookup
    /// seam the stream layer calls once per delivered event.
    pub async fn lookup(&self, id: &DropperId) -> Option<Dropper> {
        self.records
            .read()
            .await
            .get(id)
            .map(|record| record.dropper.clone())
    }

    /// When the given dropper registered, if known.
    pub async fn registered_at(&self, id: &DropperId) -> Option<DateTime<Utc>> {
        self.records
            .read()
            .await
            .get(id)
            .map(|record| record.registered_at)
    }

    /// Number of registered droppers.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the directory has no registrations.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Dropper {
        Dropper {
            id: DropperId::from(id),
            emoji: String::from("🦕"),
            pseudonym: String::from("Jaunty Diplodocus"),
        }
    }

    #[tokio::test]
    async fn lookup_returns_registered_identity() {
        let directory = DropperDirectory::new();
        directory.register(sample("user-1")).await.unwrap();

        let found = directory.lookup(&DropperId::from("user-1")).await.unwrap();
        assert_eq!(found.pseudonym, "Jaunty Diplodocus");
        assert_eq!(found.emoji, "🦕");
    }

    #[tokio::test]
    async fn lookup_of_unknown_id_returns_none() {
        let directory = DropperDirectory::new();
        assert!(directory.lookup(&DropperId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let directory = DropperDirectory::new();
        directory.register(sample("user-1")).await.unwrap();

        let result = directory.register(sample("user-1")).await;
        assert!(matches!(result, Err(DirectoryError::DuplicateId(_))));
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn blank_pseudonym_is_rejected() {
        let directory = DropperDirectory::new();
        let mut dropper = sample("user-1");
        dropper.pseudonym = String::from("   ");

        let result = directory.register(dropper).await;
        assert!(matches!(
            result,
            Err(DirectoryError::BlankField { field: "pseudonym" })
        ));
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn generated_ids_are_registered_and_distinct() {
        let directory = DropperDirectory::new();
        let a = directory
            .register_generated("🐸", "Verdant Hopper")
            .await
            .unwrap();
        let b = directory
            .register_generated("🦜", "Chatty Macaw")
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(directory.len().await, 2);
        assert!(directory.registered_at(&a).await.is_some());
    }
}
