use crate::domain::model::{FaxJob, FaxJobPriority, FileInfo};
use crate::domain::ports::RequestParser;
use crate::utils::error::{FaxError, Result};
use std::path::{Path, PathBuf};

/// 解析 `-name:value` 格式的命令列參數
///
/// ```text
/// -target_address:5551234 -sender_name:Alice -file:/tmp/memo.pdf -property:cover=urgent
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLineRequestParser;

impl CommandLineRequestParser {
    pub fn new() -> Self {
        Self
    }
}

fn parse_error(message: impl Into<String>) -> FaxError {
    FaxError::ParseError {
        message: message.into(),
    }
}

/// 拆出 `-name:value`，值本身可以包含冒號
fn split_argument(argument: &str) -> Result<(&str, &str)> {
    let body = argument
        .strip_prefix('-')
        .ok_or_else(|| parse_error(format!("Argument must start with '-': {}", argument)))?;
    let (name, value) = body
        .split_once(':')
        .ok_or_else(|| parse_error(format!("Argument must be -name:value: {}", argument)))?;
    if name.trim().is_empty() {
        return Err(parse_error(format!("Argument name is empty: {}", argument)));
    }
    Ok((name.trim(), value))
}

impl RequestParser for CommandLineRequestParser {
    type Input = [String];

    fn parse(&self, input: &[String]) -> Result<(FaxJob, FileInfo)> {
        let mut job = FaxJob::new();
        let mut file_path: Option<PathBuf> = None;
        let mut file_name: Option<String> = None;
        let mut file_content: Option<String> = None;

        for argument in input {
            let (name, value) = split_argument(argument)?;
            match name {
                "target_address" => job.target_address = value.to_string(),
                "target_name" => job.target_name = value.to_string(),
                "sender_name" => job.sender_name = value.to_string(),
                "sender_fax_number" => job.sender_fax_number = value.to_string(),
                "sender_email" => job.sender_email = value.to_string(),
                "priority" => job.priority = value.parse::<FaxJobPriority>()?,
                "file" => file_path = Some(PathBuf::from(value)),
                "file_name" => file_name = Some(value.to_string()),
                "file_content" => file_content = Some(value.to_string()),
                "property" => match value.split_once('=') {
                    Some((key, property_value)) => {
                        let key = key.trim();
                        if key.is_empty() {
                            tracing::debug!("Ignoring property without a key: {}", argument);
                        } else {
                            job.set_property(key, property_value);
                        }
                    }
                    None => {
                        return Err(parse_error(format!(
                            "Property must be -property:key=value: {}",
                            argument
                        )))
                    }
                },
                other => return Err(parse_error(format!("Unknown argument: -{}", other))),
            }
        }

        let file = match (file_path, file_content) {
            (Some(path), _) => {
                let mut file = read_file(&path)?;
                if let Some(name) = file_name {
                    file.name = name;
                }
                job.file_path = Some(path);
                file
            }
            (None, Some(content)) => {
                let file = FileInfo::new(
                    file_name.unwrap_or_else(|| "fax.txt".to_string()),
                    content.into_bytes(),
                );
                job.file_content = Some(file.clone());
                file
            }
            (None, None) => {
                return Err(parse_error(
                    "No file given; use -file:<path> or -file_content:<text>",
                ))
            }
        };

        Ok((job, file))
    }
}

fn read_file(path: &Path) -> Result<FileInfo> {
    let content = std::fs::read(path)
        .map_err(|e| parse_error(format!("Cannot read file {}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileInfo::new(name, content))
}
