//! 傳真工作狀態監控：定期查詢已提交工作的狀態並回報變化。

use crate::config::{defaults, Configuration};
use crate::core::dispatcher::FaxClient;
use crate::domain::model::{FaxActionType, FaxJob, FaxJobStatus};
use crate::utils::error::Result;
use crate::utils::validation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_POLLING_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaxStatusChange {
    pub job_id: String,
    pub previous: FaxJobStatus,
    pub current: FaxJobStatus,
}

pub trait FaxMonitorListener: Send + Sync {
    fn on_status_change(&self, change: &FaxStatusChange);
}

/// 監控由呼叫者持有的 client；執行 `run` 的任務也由呼叫者建立
pub struct FaxJobMonitor {
    client: Arc<FaxClient>,
    jobs: Vec<FaxJob>,
    listeners: Vec<Arc<dyn FaxMonitorListener>>,
}

impl FaxJobMonitor {
    pub fn new(client: Arc<FaxClient>) -> Self {
        Self {
            client,
            jobs: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// 讀取 `faxkit.monitor.polling.interval.ms`，至少 1 毫秒
    pub fn polling_interval(config: &Configuration) -> Result<Duration> {
        let key = defaults::MONITOR_POLLING_INTERVAL_MS;
        let millis = config.get_u64(key, DEFAULT_POLLING_INTERVAL_MS)?;
        validation::validate_positive_number(key, millis, 1)?;
        Ok(Duration::from_millis(millis))
    }

    pub fn add_listener(&mut self, listener: Arc<dyn FaxMonitorListener>) {
        self.listeners.push(listener);
    }

    /// 加入監控；後端不支援查詢狀態或工作尚未提交時返回 false
    pub fn watch(&mut self, job: FaxJob) -> bool {
        if !self.client.supports(FaxActionType::GetStatus) {
            tracing::warn!(
                "⚠️ Backend '{}' cannot report status; fax job not monitored",
                self.client.backend_name()
            );
            return false;
        }
        if !job.is_submitted() {
            tracing::warn!("⚠️ Only submitted fax jobs can be monitored");
            return false;
        }
        self.jobs.push(job);
        true
    }

    pub fn watched(&self) -> &[FaxJob] {
        &self.jobs
    }

    /// 查詢每個工作一次，返回本輪的狀態變化
    pub async fn poll_once(&mut self) -> Vec<FaxStatusChange> {
        let mut changes = Vec::new();

        for job in &mut self.jobs {
            let previous = job.status;
            match self.client.get_status(job).await {
                Ok(current) if current != previous => {
                    changes.push(FaxStatusChange {
                        job_id: job.id.clone().unwrap_or_default(),
                        previous,
                        current,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    // 下一輪重試
                    tracing::warn!(
                        "⚠️ Status poll failed for fax job {}: {}",
                        job.id.as_deref().unwrap_or_default(),
                        e
                    );
                }
            }
        }

        for change in &changes {
            tracing::info!(
                "🔍 Fax job {} status changed: {} -> {}",
                change.job_id,
                change.previous,
                change.current
            );
            for listener in &self.listeners {
                listener.on_status_change(change);
            }
        }

        // 進入 ERROR 的工作不再監控
        self.jobs.retain(|job| job.status != FaxJobStatus::Error);
        changes
    }

    /// 以 client 配置中的輪詢間隔執行 [`FaxJobMonitor::run`]
    pub async fn run_configured(&mut self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let interval = Self::polling_interval(self.client.configuration())?;
        self.run(interval, shutdown).await
    }

    /// 依間隔輪詢，直到 `shutdown` 變為 true
    pub async fn run(&mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!("🔍 Monitoring {} fax job(s) every {:?}", self.jobs.len(), interval);
        let mut ticker = tokio::time::interval(interval);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("🛑 Fax job monitor stopped");
        Ok(())
    }
}
