//! 以外部指令執行傳真操作的後端。
//!
//! 每個操作對應一條指令模板 `faxkit.{0}.{action}.command`，模板先依 shell
//! 規則切分為參數，再逐一代入 `${token}`，因此含空白的欄位值仍是單一參數。

use crate::config::{defaults, Configuration};
use crate::core::classifier::{Classification, ResponseClassifier, ResponseEnvelope};
use crate::core::template;
use crate::domain::model::{Capabilities, FaxActionType, FaxJob, FaxJobStatus};
use crate::domain::ports::FaxBackend;
use crate::utils::error::{FaxError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;

pub const BACKEND_KEY: &str = "process";

/// 註冊表使用的建構函式
pub fn create_backend(config: &Configuration) -> Result<Arc<dyn FaxBackend>> {
    Ok(Arc::new(ProcessBackend::from_config(config)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ProcessSettings {
    pub property_part: String,
    pub commands: BTreeMap<FaxActionType, String>,
    pub timeout_ms: u64,
    pub output_format: OutputFormat,
    pub temp_dir: Option<PathBuf>,
}

impl ProcessSettings {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let property_part = config.property_part().unwrap_or(BACKEND_KEY).to_string();

        let commands = FaxActionType::ALL
            .iter()
            .filter_map(|&action| {
                config
                    .get_part(&defaults::action_key(defaults::PROCESS_COMMAND, action))
                    .map(|command| (action, command.to_string()))
            })
            .collect();

        let format_key = config.part_key(defaults::PROCESS_OUTPUT_FORMAT);
        let format = config.get_or(&format_key, "text");
        validation::validate_one_of(&format_key, format, &["text", "json"])?;
        let output_format = if format.trim().eq_ignore_ascii_case("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let settings = Self {
            property_part,
            commands,
            timeout_ms: config.get_u64(&config.part_key(defaults::PROCESS_TIMEOUT_MS), 120_000)?,
            output_format,
            temp_dir: config.get_part(defaults::TEMP_DIR).map(PathBuf::from),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn key(&self, template: &str) -> String {
        template.replace(defaults::PROPERTY_PART_MARKER, &self.property_part)
    }
}

impl Validate for ProcessSettings {
    fn validate(&self) -> Result<()> {
        if self.commands.is_empty() {
            return Err(FaxError::MissingConfigError {
                key: self.key(&defaults::action_key(
                    defaults::PROCESS_COMMAND,
                    FaxActionType::Submit,
                )),
            });
        }
        for (action, command) in &self.commands {
            let key = self.key(&defaults::action_key(defaults::PROCESS_COMMAND, *action));
            split_command_line(&key, command)?;
        }
        validation::validate_positive_number(
            &self.key(defaults::PROCESS_TIMEOUT_MS),
            self.timeout_ms,
            1,
        )
    }
}

pub struct ProcessBackend {
    settings: ProcessSettings,
    classifier: ResponseClassifier,
}

impl ProcessBackend {
    pub fn new(settings: ProcessSettings, classifier: ResponseClassifier) -> Self {
        Self {
            settings,
            classifier,
        }
    }

    pub fn from_config(config: &Configuration) -> Result<Self> {
        let settings = ProcessSettings::from_config(config)?;
        let classifier = ResponseClassifier::from_config(config)?;
        tracing::debug!(
            "⚙️ Process backend '{}' configured for: {:?}",
            settings.property_part,
            settings.commands.keys().collect::<Vec<_>>()
        );
        Ok(Self::new(settings, classifier))
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    async fn execute(&self, action: FaxActionType, job: &FaxJob) -> Result<Classification> {
        let command = self
            .settings
            .commands
            .get(&action)
            .ok_or_else(|| FaxError::unsupported(action, self.name()))?;

        // 只有記憶體內容的檔案寫到暫存檔，離開此函式時刪除
        let staged = self.stage_file(action, job)?;
        let mut extra = HashMap::new();
        if let Some(file) = &staged {
            extra.insert(template::FILE.to_string(), file.path().display().to_string());
        }
        if let Some(file) = &job.file_content {
            extra.insert("file.name".to_string(), file.name.clone());
        }

        let key = self
            .settings
            .key(&defaults::action_key(defaults::PROCESS_COMMAND, action));
        let values = template::bindings(job, &extra);
        let argv: Vec<String> = split_command_line(&key, command)?
            .iter()
            .map(|arg| template::render_with(arg, &values))
            .collect();

        let (program, args) = match argv.split_first() {
            Some((program, args)) if !program.trim().is_empty() => (program, args),
            _ => {
                return Err(FaxError::InvalidConfigValueError {
                    key,
                    value: command.clone(),
                    reason: "Command renders to an empty program name".to_string(),
                })
            }
        };
        tracing::debug!("⚙️ Running {} command: {:?}", action, argv);

        let mut child = Command::new(program);
        child.args(args).stdin(Stdio::null()).kill_on_drop(true);
        let output = tokio::time::timeout(Duration::from_millis(self.settings.timeout_ms), child.output())
            .await
            .map_err(|_| FaxError::TimeoutError {
                operation: format!("{} command '{}'", action, program),
                timeout_ms: self.settings.timeout_ms,
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        // 被訊號終止時沒有退出碼
        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!("⚙️ {} command exited with {}", action, exit_code);

        // 輸出不是 JSON 時只保留文字，不視為失敗
        let tree = match self.settings.output_format {
            OutputFormat::Json if exit_code == 0 => {
                match serde_json::from_str::<serde_json::Value>(stdout.trim()) {
                    Ok(tree) => Some(tree),
                    Err(e) => {
                        tracing::debug!("⚙️ {} output is not JSON, using text only: {}", action, e);
                        None
                    }
                }
            }
            _ => None,
        };
        let envelope = ResponseEnvelope::from_process(exit_code, stdout, stderr).with_tree(tree);

        self.classifier.classify(&envelope, action).into_result(action)
    }

    fn stage_file(&self, action: FaxActionType, job: &FaxJob) -> Result<Option<NamedTempFile>> {
        if action != FaxActionType::Submit || job.file_path.is_some() {
            return Ok(None);
        }
        let Some(file) = &job.file_content else {
            return Ok(None);
        };

        let suffix = format!("-{}", file.name.replace(['/', '\\'], "_"));
        let mut builder = tempfile::Builder::new();
        builder.prefix("faxkit-").suffix(&suffix);
        let mut staged = match &self.settings.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        staged.write_all(&file.content)?;
        staged.flush()?;
        tracing::debug!("📄 Staged fax content at {}", staged.path().display());
        Ok(Some(staged))
    }
}

#[async_trait]
impl FaxBackend for ProcessBackend {
    fn name(&self) -> &str {
        BACKEND_KEY
    }

    fn property_part(&self) -> &str {
        &self.settings.property_part
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::from_actions(self.settings.commands.keys().copied())
    }

    async fn submit(&self, job: &FaxJob) -> Result<Option<String>> {
        Ok(self.execute(FaxActionType::Submit, job).await?.job_id)
    }

    async fn suspend(&self, job: &FaxJob) -> Result<()> {
        self.execute(FaxActionType::Suspend, job).await.map(|_| ())
    }

    async fn resume(&self, job: &FaxJob) -> Result<()> {
        self.execute(FaxActionType::Resume, job).await.map(|_| ())
    }

    async fn cancel(&self, job: &FaxJob) -> Result<()> {
        self.execute(FaxActionType::Cancel, job).await.map(|_| ())
    }

    async fn get_status(&self, job: &FaxJob) -> Result<FaxJobStatus> {
        Ok(self.execute(FaxActionType::GetStatus, job).await?.status)
    }
}

/// 依 shell 規則切分指令：空白分隔，單引號內為字面值，雙引號內可用 `\` 跳脫
pub fn split_command_line(key: &str, command: &str) -> Result<Vec<String>> {
    shlex::split(command).ok_or_else(|| FaxError::InvalidConfigValueError {
        key: key.to_string(),
        value: command.to_string(),
        reason: "Unterminated quote or trailing escape in command".to_string(),
    })
}
