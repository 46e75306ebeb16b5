// handlers/protected/frenlets/mod.rs - Frenlets: short tagged messages between
// mutual followers, stored once in the sender's outgoing box and once in the
// receiver's incoming box. Every write touching both copies goes through a
// single `WriteBatch` so the copies cannot diverge.

pub mod frenlet;
pub mod replies;
pub mod tags;

use tracing::error;

use crate::error::ApiError;
use crate::store::{DocumentStore, StoreError, WriteBatch};

pub const MAX_FRENLET_CHARS: usize = 300;

/// Commits a batch over both frenlet copies. A missing copy aborts the whole
/// batch; that state is only reachable through data written before batching
/// and is fixed by `frenlets/repairMirrors`.
async fn commit_mirrored(store: &dyn DocumentStore, batch: WriteBatch, action: &'static str) -> Result<(), ApiError> {
    store.commit(batch).await.map_err(|e| match e {
        StoreError::NotFound(path) => {
            error!(action, %path, "frenlet copy missing, batch rolled back");
            ApiError::internal_server_error("Frenlet copies are out of sync, run frenlets/repairMirrors")
        }
        other => other.into(),
    })
}
