use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use super::service::now_ms;
use crate::db::TokenRepository;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Periodically purges tokens whose validity window has elapsed.
#[derive(Clone)]
pub struct ExpirySweeper {
    repo: Arc<dyn TokenRepository>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(repo: Arc<dyn TokenRepository>, interval: Duration) -> Self {
        Self { repo, interval }
    }

    /// One tick. A row that fails to delete is logged and left for the next tick.
    pub async fn sweep_once(&self, now_ms: i64) -> Result<SweepReport> {
        let expired = self.repo.find_expired(now_ms).await?;
        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };

        for token in expired {
            match self.repo.delete(token.id).await {
                Ok(true) => {
                    log::debug!("Expired token deleted: {}", token.id);
                    report.removed += 1;
                }
                // already gone (logout or a concurrent reissue)
                Ok(false) => {}
                Err(err) => {
                    log::warn!("Error deleting expired token {}: {}", token.id, err);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);
            loop {
                interval.tick().await;
                match self.sweep_once(now_ms()).await {
                    Ok(report) if report.removed > 0 || report.failed > 0 => {
                        log::info!(
                            "Background cleanup: removed {} expired tokens ({} failed)",
                            report.removed,
                            report.failed
                        );
                    }
                    Ok(_) => log::debug!("Background cleanup: no expired tokens"),
                    Err(err) => log::warn!("Background cleanup: token sweep failed: {}", err),
                }
            }
        })
    }
}
