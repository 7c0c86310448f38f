//! Lookup-then-create, serialized per service handle.

use std::future::Future;
use tokio::sync::Mutex;

use gdclient_common::{Ensured, Error, ResourceHandle, ResourceKind, Result};

/// Runs check-then-act sequences one at a time.
///
/// The guard only covers callers sharing this instance. Two processes, or
/// two services built over the same backend, can still race.
#[derive(Debug, Default)]
pub struct Ensurer {
    lock: Mutex<()>,
}

impl Ensurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the first resource `lookup` finds, or the one `create` makes.
    ///
    /// The lock is held across both calls. Errors from either are returned
    /// unchanged and nothing is retried.
    pub async fn ensure<L, LF, C, CF>(
        &self,
        kind: ResourceKind,
        name: &str,
        lookup: L,
        create: C,
    ) -> Result<Ensured>
    where
        L: FnOnce() -> LF,
        LF: Future<Output = Result<Option<ResourceHandle>>>,
        C: FnOnce() -> CF,
        CF: Future<Output = Result<ResourceHandle>>,
    {
        if name.is_empty() {
            return Err(Error::InvalidInput(format!("{} name cannot be empty", kind)));
        }

        let _guard = self.lock.lock().await;

        if let Some(existing) = lookup().await? {
            tracing::debug!(%kind, name, id = %existing.id, "Found existing resource");
            return Ok(Ensured::existing(existing));
        }

        let created = create().await?;
        tracing::info!(%kind, name, id = %created.id, parent = %created.parent_id, "Created resource");
        Ok(Ensured::created(created))
    }
}

/// Substitute `default` for an empty parent id.
pub fn normalize_parent<'a>(parent_id: &'a str, default: &'a str) -> &'a str {
    if parent_id.is_empty() {
        default
    } else {
        parent_id
    }
}
