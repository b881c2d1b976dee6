//! Cleanup service for deleting stale execution workspaces.
//!
//! A run removes its own workspace when it ends. Workspaces left behind by a
//! crashed process are swept here once they exceed the retention period.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::time::interval;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::services::orchestrator::WORKSPACE_PREFIX;

/// Configuration for the cleanup service.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Directory holding execution workspaces
    pub work_dir: PathBuf,
    /// Workspace retention period in hours
    pub retention_hours: u64,
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

/// Start the cleanup background task.
///
/// This spawns a tokio task that periodically removes workspaces that have
/// exceeded the retention period.
pub fn start_cleanup_task(config: CleanupConfig) {
    tokio::spawn(async move {
        info!(
            "Starting cleanup service (retention: {} hours, interval: {} seconds)",
            config.retention_hours, config.interval_secs
        );

        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));

        loop {
            ticker.tick().await;

            if let Err(e) = run_cleanup(&config).await {
                error!("Cleanup task error: {}", e);
            }
        }
    });
}

/// Run a single cleanup cycle, returning the number of workspaces removed.
pub async fn run_cleanup(config: &CleanupConfig) -> AppResult<usize> {
    let retention = Duration::from_secs(config.retention_hours.saturating_mul(3600));
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut dir = match tokio::fs::read_dir(&config.work_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(AppError::FileSystem(format!(
                "Failed to read work dir {}: {}",
                config.work_dir.display(),
                e
            )));
        }
    };

    let mut deleted_count = 0;
    let mut error_count = 0;

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| AppError::FileSystem(format!("Failed to read work dir entry: {}", e)))?
    {
        let path = entry.path();
        let is_workspace = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(WORKSPACE_PREFIX));
        if !is_workspace {
            continue;
        }

        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        let expired = metadata.is_dir()
            && metadata
                .modified()
                .map(|modified| modified <= cutoff)
                .unwrap_or(false);
        if !expired {
            continue;
        }

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!("Deleted stale workspace {}", path.display());
                deleted_count += 1;
            }
            Err(e) => {
                warn!("Failed to delete workspace {}: {}", path.display(), e);
                error_count += 1;
            }
        }
    }

    if deleted_count > 0 || error_count > 0 {
        info!(
            "Workspace cleanup: {} deleted, {} errors",
            deleted_count, error_count
        );
    }

    Ok(deleted_count)
}
