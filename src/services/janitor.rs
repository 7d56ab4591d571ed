//! Reclaims multipart uploads whose callers walked away.
//!
//! Stores never expire sessions on their own. The host process may run this
//! janitor, which aborts every upload older than a TTL through the regular
//! [`FileStore`](crate::services::file_store::FileStore) contract.

use crate::services::{file_store::ErrorKind, registry::FileStoreRegistry};
use chrono::Utc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Abort every upload older than `ttl` across all stores. Returns how many
/// uploads were reclaimed.
pub async fn reap_stale_uploads(registry: &FileStoreRegistry, ttl: Duration) -> usize {
    let now = Utc::now();
    let mut reclaimed = 0;

    for (name, store) in registry.iter() {
        for upload in store.list_multipart_uploads() {
            let stale = (now - upload.created_at)
                .to_std()
                .is_ok_and(|age| age >= ttl);
            if !stale {
                continue;
            }

            match store
                .abort_multipart_upload(&upload.file_path, &upload.upload_id)
                .await
            {
                Ok(()) => {
                    reclaimed += 1;
                    info!(
                        "reclaimed stale upload {} for {} in store '{}' ({}/{} parts)",
                        upload.upload_id,
                        upload.file_path,
                        name,
                        upload.uploaded_parts,
                        upload.total_parts
                    );
                }
                // completed or aborted since the snapshot
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("upload {} already gone", upload.upload_id);
                }
                Err(err) => warn!("unable to reclaim upload {}: {}", upload.upload_id, err),
            }
        }
    }
    reclaimed
}

/// Run [`reap_stale_uploads`] periodically in the background.
pub fn spawn(registry: FileStoreRegistry, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 2).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
    info!("upload janitor sweeping every {:?} (ttl {:?})", period, ttl);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reclaimed = reap_stale_uploads(&registry, ttl).await;
            if reclaimed > 0 {
                info!("janitor reclaimed {} stale uploads", reclaimed);
            }
        }
    })
}
