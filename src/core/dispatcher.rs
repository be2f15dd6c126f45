//! 傳真操作分派器。
//!
//! 每個操作依序：檢查後端能力 → 驗證工作狀態 → 呼叫後端 → 成功後才寫回
//! `job.id` / `job.status` → 通知監聽器。後端的傳輸錯誤統一包裝為
//! `BackendError`。框架不會自行建立執行緒或任務。

use crate::config::{ConfigLayer, Configuration, ConfigurationBuilder};
use crate::core::events::{FaxActionEvent, FaxActionListener};
use crate::core::registry::BackendRegistry;
use crate::domain::model::{FaxActionType, FaxJob, FaxJobStatus};
use crate::domain::ports::FaxBackend;
use crate::utils::error::{FaxError, Result};
use std::sync::Arc;

pub struct FaxClient {
    backend: Arc<dyn FaxBackend>,
    configuration: Arc<Configuration>,
    listeners: Vec<Arc<dyn FaxActionListener>>,
}

impl FaxClient {
    pub fn new(backend: Arc<dyn FaxBackend>, configuration: Configuration) -> Self {
        Self {
            backend,
            configuration: Arc::new(configuration),
            listeners: Vec::new(),
        }
    }

    /// 合併配置層並從註冊表建立後端
    ///
    /// property part 未指定時使用配置中的 `faxkit.property.part`，再退回後端名稱。
    pub fn from_registry(
        registry: &BackendRegistry,
        backend_key: &str,
        layers: &[ConfigLayer],
        property_part: Option<&str>,
    ) -> Result<Self> {
        let global = crate::config::resolve(layers, None);
        let part = property_part
            .map(str::to_string)
            .or_else(|| {
                global
                    .get(crate::config::defaults::PROPERTY_PART)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| backend_key.to_string());

        let configuration = crate::config::resolve(layers, Some(&part));
        let backend = registry.create(backend_key, &configuration)?;
        tracing::info!(
            "🔧 Backend '{}' initialized (property part: {})",
            backend.name(),
            backend.property_part()
        );
        Ok(Self::new(backend, configuration))
    }

    /// 以 `ConfigurationBuilder` 的層建立
    pub fn from_builder(
        registry: &BackendRegistry,
        backend_key: &str,
        builder: &ConfigurationBuilder,
        property_part: Option<&str>,
    ) -> Result<Self> {
        Self::from_registry(registry, backend_key, builder.layers(), property_part)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn FaxActionListener>) {
        self.listeners.push(listener);
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn supports(&self, action: FaxActionType) -> bool {
        self.backend.capabilities().supports(action)
    }

    pub fn create_job(&self) -> FaxJob {
        FaxJob::new()
    }

    pub async fn submit(&self, job: &mut FaxJob) -> Result<()> {
        let action = FaxActionType::Submit;
        self.check_capability(action)?;
        validate_for_submit(job)?;

        tracing::debug!(
            "📤 Submitting fax job to {} via {}",
            job.target_address,
            self.backend.name()
        );
        let id = self
            .backend
            .submit(job)
            .await
            .map_err(|e| self.fail(action, e))?;

        match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                tracing::info!("✅ Fax job submitted (id: {})", id);
                job.id = Some(id);
            }
            None => {
                // 舊的 id 屬於前一次提交
                tracing::warn!(
                    "⚠️ Backend '{}' accepted the fax job but returned no id",
                    self.backend.name()
                );
                job.id = None;
            }
        }
        self.notify(action, job);
        Ok(())
    }

    pub async fn suspend(&self, job: &mut FaxJob) -> Result<()> {
        let action = FaxActionType::Suspend;
        self.prepare(action, job)?;
        self.backend
            .suspend(job)
            .await
            .map_err(|e| self.fail(action, e))?;
        self.complete(action, job);
        Ok(())
    }

    pub async fn resume(&self, job: &mut FaxJob) -> Result<()> {
        let action = FaxActionType::Resume;
        self.prepare(action, job)?;
        self.backend
            .resume(job)
            .await
            .map_err(|e| self.fail(action, e))?;
        self.complete(action, job);
        Ok(())
    }

    pub async fn cancel(&self, job: &mut FaxJob) -> Result<()> {
        let action = FaxActionType::Cancel;
        self.prepare(action, job)?;
        self.backend
            .cancel(job)
            .await
            .map_err(|e| self.fail(action, e))?;
        self.complete(action, job);
        Ok(())
    }

    pub async fn get_status(&self, job: &mut FaxJob) -> Result<FaxJobStatus> {
        let action = FaxActionType::GetStatus;
        self.prepare(action, job)?;
        let status = self
            .backend
            .get_status(job)
            .await
            .map_err(|e| self.fail(action, e))?;
        job.status = status;
        self.complete(action, job);
        Ok(status)
    }

    /// 釋放後端資源；之後不應再使用此 client
    pub async fn shutdown(&self) -> Result<()> {
        tracing::debug!("🛑 Shutting down backend '{}'", self.backend.name());
        self.backend.shutdown().await
    }

    fn check_capability(&self, action: FaxActionType) -> Result<()> {
        if self.supports(action) {
            Ok(())
        } else {
            Err(FaxError::unsupported(action, self.backend.name()))
        }
    }

    fn prepare(&self, action: FaxActionType, job: &FaxJob) -> Result<()> {
        self.check_capability(action)?;
        if !job.is_submitted() {
            return Err(FaxError::InvalidStateError {
                action,
                message: "fax job has no id; submit it first".to_string(),
            });
        }
        tracing::debug!(
            "📠 {} fax job {} via {}",
            action,
            job.id.as_deref().unwrap_or_default(),
            self.backend.name()
        );
        Ok(())
    }

    fn complete(&self, action: FaxActionType, job: &FaxJob) {
        tracing::info!(
            "✅ {} completed for fax job {}",
            action,
            job.id.as_deref().unwrap_or_default()
        );
        self.notify(action, job);
    }

    fn fail(&self, action: FaxActionType, err: FaxError) -> FaxError {
        let err = err.wrap_transport(action);
        tracing::error!("❌ {} failed on backend '{}': {}", action, self.backend.name(), err);
        err
    }

    fn notify(&self, action: FaxActionType, job: &FaxJob) {
        if self.listeners.is_empty() {
            return;
        }
        let event = FaxActionEvent::new(action, self.backend.name(), job);
        for listener in &self.listeners {
            listener.on_action(&event);
        }
    }
}

fn validate_for_submit(job: &FaxJob) -> Result<()> {
    if job.target_address.trim().is_empty() {
        return Err(FaxError::ValidationError {
            message: "Fax job target address is empty".to_string(),
        });
    }
    if !job.has_file() {
        return Err(FaxError::ValidationError {
            message: "Fax job has no file to send".to_string(),
        });
    }
    Ok(())
}
