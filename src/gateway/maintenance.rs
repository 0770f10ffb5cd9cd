//! Periodic housekeeping: WAL checkpoint, retention pruning, and the temp
//! audio sweep. Takeover GC runs on the pipeline task, see [`Gateway::gc_takeovers`].

use super::{locked, Gateway};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// What one maintenance pass cleaned up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub turns_pruned: u64,
    pub clips_swept: usize,
}

/// Delete regular files in `dir` last modified more than `max_age` before `now`.
pub(crate) fn sweep_dir(dir: &Path, max_age: Duration, now: SystemTime) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age > max_age {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("sweep: could not remove {}: {e}", path.display()),
            }
        }
    }
    removed
}

impl Gateway {
    pub(super) async fn maintenance_loop(self: Arc<Self>) {
        let every = Duration::from_secs(self.config.gateway.maintenance_interval_secs.max(1));
        loop {
            tokio::time::sleep(every).await;
            let report = self.maintenance_pass().await;
            if report != MaintenanceReport::default() {
                info!("maintenance: {report:?}");
            }
        }
    }

    /// One housekeeping pass. Touches only the store and the filesystem.
    pub async fn maintenance_pass(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        if let Err(e) = self.store.checkpoint().await {
            warn!("maintenance: checkpoint failed: {e}");
        }

        match self
            .store
            .prune_older_than(self.config.memory.retention_days)
            .await
        {
            Ok(n) => report.turns_pruned = n,
            Err(e) => warn!("maintenance: pruning failed: {e}"),
        }

        let max_age = Duration::from_secs(self.config.gateway.temp_audio_max_age_secs);
        report.clips_swept = sweep_dir(&self.audio_dir(), max_age, SystemTime::now());

        debug!("maintenance pass done");
        report
    }

    /// Drop takeover records idle past the GC horizon. Called from the run
    /// loop so owner state is only mutated on the pipeline task.
    pub(super) fn gc_takeovers(&self, now: i64) -> usize {
        let dropped = locked(&self.takeover).gc(now);
        if dropped > 0 {
            debug!("takeover gc: dropped {dropped} record(s)");
        }
        dropped
    }
}
