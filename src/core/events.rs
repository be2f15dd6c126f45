use crate::domain::model::{FaxActionType, FaxJob, FaxJobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 操作成功後發出的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaxActionEvent {
    pub action: FaxActionType,
    pub backend: String,
    pub job_id: Option<String>,
    pub status: FaxJobStatus,
    pub timestamp: DateTime<Utc>,
}

impl FaxActionEvent {
    pub fn new(action: FaxActionType, backend: &str, job: &FaxJob) -> Self {
        Self {
            action,
            backend: backend.to_string(),
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }
}

pub trait FaxActionListener: Send + Sync {
    fn on_action(&self, event: &FaxActionEvent);
}

/// 將事件寫入日誌
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingActionListener;

impl FaxActionListener for LoggingActionListener {
    fn on_action(&self, event: &FaxActionEvent) {
        tracing::info!(
            "📠 {} via {} (job: {}, status: {}) at {}",
            event.action,
            event.backend,
            event.job_id.as_deref().unwrap_or("-"),
            event.status,
            event.timestamp.to_rfc3339()
        );
    }
}
