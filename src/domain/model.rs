use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::utils::error::{FaxError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaxJobPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl FromStr for FaxJobPriority {
    type Err = FaxError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(FaxJobPriority::Low),
            "NORMAL" => Ok(FaxJobPriority::Normal),
            "HIGH" => Ok(FaxJobPriority::High),
            "URGENT" => Ok(FaxJobPriority::Urgent),
            other => Err(FaxError::ParseError {
                message: format!("Unknown fax job priority: {}", other),
            }),
        }
    }
}

/// 與後端無關的標準傳真狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaxJobStatus {
    #[default]
    Unknown,
    Pending,
    InProgress,
    Error,
}

impl fmt::Display for FaxJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaxJobStatus::Unknown => "UNKNOWN",
            FaxJobStatus::Pending => "PENDING",
            FaxJobStatus::InProgress => "IN_PROGRESS",
            FaxJobStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// 五種標準傳真操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaxActionType {
    Submit,
    Suspend,
    Resume,
    Cancel,
    GetStatus,
}

impl FaxActionType {
    pub const ALL: [FaxActionType; 5] = [
        FaxActionType::Submit,
        FaxActionType::Suspend,
        FaxActionType::Resume,
        FaxActionType::Cancel,
        FaxActionType::GetStatus,
    ];

    /// 配置鍵中使用的操作名稱，例如 `faxkit.{0}.submit.command`
    pub fn config_name(&self) -> &'static str {
        match self {
            FaxActionType::Submit => "submit",
            FaxActionType::Suspend => "suspend",
            FaxActionType::Resume => "resume",
            FaxActionType::Cancel => "cancel",
            FaxActionType::GetStatus => "status",
        }
    }
}

impl fmt::Display for FaxActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaxActionType::Submit => "submit",
            FaxActionType::Suspend => "suspend",
            FaxActionType::Resume => "resume",
            FaxActionType::Cancel => "cancel",
            FaxActionType::GetStatus => "get-status",
        };
        f.write_str(name)
    }
}

impl FromStr for FaxActionType {
    type Err = FaxError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(FaxActionType::Submit),
            "suspend" => Ok(FaxActionType::Suspend),
            "resume" => Ok(FaxActionType::Resume),
            "cancel" => Ok(FaxActionType::Cancel),
            "status" | "get-status" | "get_status" => Ok(FaxActionType::GetStatus),
            other => Err(FaxError::ParseError {
                message: format!("Unknown fax action: {}", other),
            }),
        }
    }
}

/// 後端實作的操作集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    actions: BTreeSet<FaxActionType>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self::from_actions(FaxActionType::ALL)
    }

    pub fn from_actions(actions: impl IntoIterator<Item = FaxActionType>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }

    pub fn with(mut self, action: FaxActionType) -> Self {
        self.actions.insert(action);
        self
    }

    pub fn supports(&self, action: FaxActionType) -> bool {
        self.actions.contains(&action)
    }

    pub fn actions(&self) -> impl Iterator<Item = FaxActionType> + '_ {
        self.actions.iter().copied()
    }
}

/// 檔案名稱與內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub content: Vec<u8>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// 從磁碟讀取檔案
    pub async fn from_path(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }
}

/// 傳真工作：呼叫者擁有，框架只在操作期間讀寫
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaxJob {
    pub id: Option<String>,
    pub target_address: String,
    pub target_name: String,
    pub sender_name: String,
    pub sender_fax_number: String,
    pub sender_email: String,
    pub priority: FaxJobPriority,
    pub file_path: Option<PathBuf>,
    pub file_content: Option<FileInfo>,
    pub properties: HashMap<String, String>,
    pub status: FaxJobStatus,
}

impl FaxJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已有後端指派的 id 即視為已提交
    pub fn is_submitted(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }

    pub fn has_file(&self) -> bool {
        self.file_path.is_some() || self.file_content.is_some()
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// 取得檔案內容：優先使用記憶體中的內容，否則從 `file_path` 讀取
    pub async fn resolve_file(&self) -> Result<FileInfo> {
        if let Some(file) = &self.file_content {
            return Ok(file.clone());
        }
        match &self.file_path {
            Some(path) => FileInfo::from_path(path).await,
            None => Err(FaxError::ValidationError {
                message: "Fax job has neither a file path nor file content".to_string(),
            }),
        }
    }
}
