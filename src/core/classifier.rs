//! 回應分類：將後端原始回應（文字、JSON、退出碼）對應為標準狀態。

use crate::config::defaults;
use crate::config::Configuration;
use crate::domain::model::{FaxActionType, FaxJobStatus};
use crate::utils::error::{FaxError, Result};
use serde_json::Value;
use std::collections::HashSet;

/// 選取整段文字的路徑
pub const TEXT_PATH: &str = "$";

/// 分類器的輸入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEnvelope {
    pub text: Option<String>,
    pub tree: Option<Value>,
    pub exit_code: Option<i32>,
    pub stderr: Option<String>,
}

impl ResponseEnvelope {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_json(tree: Value) -> Self {
        Self {
            text: Some(tree.to_string()),
            tree: Some(tree),
            ..Self::default()
        }
    }

    /// 文字可解析為 JSON 時同時保留結構
    pub fn from_body(body: impl Into<String>) -> Self {
        let text = body.into();
        let tree = serde_json::from_str::<Value>(&text).ok();
        Self {
            text: Some(text),
            tree,
            ..Self::default()
        }
    }

    pub fn from_process(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            text: Some(stdout.into()),
            tree: None,
            exit_code: Some(exit_code),
            stderr: Some(stderr.into()),
        }
    }

    pub fn with_tree(mut self, tree: Option<Value>) -> Self {
        self.tree = tree;
        self
    }

    /// 以點分路徑取值；路徑不存在時返回 `None`
    ///
    /// `$` 選取整段文字。陣列以數字索引，例如 `data.items.0.id`。
    pub fn extract(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path == TEXT_PATH {
            return self
                .text
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string);
        }

        let mut current = self.tree.as_ref()?;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match current {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Equals,
    Prefix,
    Contains,
}

impl MatchMode {
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "equals" => Ok(MatchMode::Equals),
            "prefix" => Ok(MatchMode::Prefix),
            "contains" => Ok(MatchMode::Contains),
            _ => Err(FaxError::InvalidConfigValueError {
                key: key.to_string(),
                value: value.to_string(),
                reason: "Expected one of: equals, prefix, contains".to_string(),
            }),
        }
    }

    fn matches(&self, candidate: &str, literal: &str) -> bool {
        match self {
            MatchMode::Equals => candidate == literal,
            MatchMode::Prefix => candidate.starts_with(literal),
            MatchMode::Contains => candidate.contains(literal),
        }
    }
}

/// 錯誤偵測規則
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRule {
    pub path: String,
    pub value: String,
    pub mode: MatchMode,
    pub message_path: Option<String>,
}

/// 各標準狀態的字串集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    pending: HashSet<String>,
    in_progress: HashSet<String>,
    error: HashSet<String>,
}

impl StatusTable {
    /// 由分號分隔的字串建立，例如 `"queued;waiting"`
    pub fn from_lists(pending: &str, in_progress: &str, error: &str) -> Self {
        Self {
            pending: split_set(pending),
            in_progress: split_set(in_progress),
            error: split_set(error),
        }
    }

    /// 不屬於任何集合的值為 `UNKNOWN`
    pub fn lookup(&self, value: &str) -> FaxJobStatus {
        let value = value.trim();
        if self.pending.contains(value) {
            FaxJobStatus::Pending
        } else if self.in_progress.contains(value) {
            FaxJobStatus::InProgress
        } else if self.error.contains(value) {
            FaxJobStatus::Error
        } else {
            FaxJobStatus::Unknown
        }
    }
}

fn split_set(list: &str) -> HashSet<String> {
    list.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierRules {
    pub error_rule: Option<ErrorRule>,
    pub id_path: Option<String>,
    pub status_path: Option<String>,
    pub status_table: StatusTable,
}

/// 分類結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub failed: bool,
    pub status: FaxJobStatus,
    pub job_id: Option<String>,
    pub error_message: Option<String>,
}

impl Classification {
    fn failure(message: Option<String>) -> Self {
        Self {
            failed: true,
            status: FaxJobStatus::Error,
            job_id: None,
            error_message: message,
        }
    }

    /// 失敗時轉為 `BackendError`
    pub fn into_result(self, action: FaxActionType) -> Result<Self> {
        if self.failed {
            let message = self
                .error_message
                .unwrap_or_else(|| "Backend reported an error".to_string());
            Err(FaxError::backend(action, message))
        } else {
            Ok(self)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseClassifier {
    rules: ClassifierRules,
}

impl ResponseClassifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// 從 `faxkit.{0}.response.*` 讀取規則
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let error_rule = match config.get_part(defaults::RESPONSE_ERROR_PATH) {
            Some(path) => {
                let match_key = config.part_key(defaults::RESPONSE_ERROR_MATCH);
                Some(ErrorRule {
                    path: path.to_string(),
                    value: config.require_part(defaults::RESPONSE_ERROR_VALUE)?.to_string(),
                    mode: MatchMode::parse(&match_key, config.get_or(&match_key, "equals"))?,
                    message_path: config
                        .get_part(defaults::RESPONSE_ERROR_MESSAGE_PATH)
                        .map(str::to_string),
                })
            }
            None => None,
        };

        let status_table = StatusTable::from_lists(
            config.get_part(defaults::RESPONSE_STATUS_PENDING).unwrap_or_default(),
            config.get_part(defaults::RESPONSE_STATUS_IN_PROGRESS).unwrap_or_default(),
            config.get_part(defaults::RESPONSE_STATUS_ERROR).unwrap_or_default(),
        );

        Ok(Self::new(ClassifierRules {
            error_rule,
            id_path: config
                .get_part(defaults::RESPONSE_SUBMIT_ID_PATH)
                .map(str::to_string),
            status_path: config
                .get_part(defaults::RESPONSE_STATUS_PATH)
                .map(str::to_string),
            status_table,
        }))
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    pub fn classify(&self, envelope: &ResponseEnvelope, action: FaxActionType) -> Classification {
        // 退出碼非零即失敗，不看輸出內容
        if let Some(code) = envelope.exit_code {
            if code != 0 {
                let diagnostic = envelope
                    .stderr
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .or_else(|| envelope.text.as_deref().map(str::trim).filter(|s| !s.is_empty()));
                let message = match diagnostic {
                    Some(output) => format!("Exit code {}: {}", code, output),
                    None => format!("Exit code {}", code),
                };
                return Classification::failure(Some(message));
            }
        }

        if let Some(rule) = &self.rules.error_rule {
            if let Some(candidate) = envelope.extract(&rule.path) {
                if rule.mode.matches(&candidate, &rule.value) {
                    let message = rule
                        .message_path
                        .as_deref()
                        .and_then(|path| envelope.extract(path))
                        .or(Some(candidate));
                    return Classification::failure(message);
                }
            }
        }

        let mut outcome = Classification::default();
        match action {
            FaxActionType::Submit => {
                outcome.job_id = self
                    .rules
                    .id_path
                    .as_deref()
                    .and_then(|path| envelope.extract(path));
            }
            FaxActionType::GetStatus => {
                outcome.status = self
                    .rules
                    .status_path
                    .as_deref()
                    .and_then(|path| envelope.extract(path))
                    .map(|value| self.rules.status_table.lookup(&value))
                    .unwrap_or(FaxJobStatus::Unknown);
            }
            _ => {}
        }
        outcome
    }
}
