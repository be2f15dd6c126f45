use crate::core::template;
use crate::utils::error::{FaxError, Result};
use std::collections::BTreeMap;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 檢查 URL 格式；`${...}` 佔位符先以樣本值代入再解析
pub fn validate_url(key: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(FaxError::InvalidConfigValueError {
            key: key.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    let samples: BTreeMap<String, String> = template::placeholders(url_str)
        .into_iter()
        .map(|token| (token, "placeholder".to_string()))
        .collect();
    let probe = template::render_with(url_str, &samples);

    match Url::parse(&probe) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(FaxError::InvalidConfigValueError {
                key: key.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(FaxError::InvalidConfigValueError {
            key: key.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(key: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(FaxError::InvalidConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FaxError::InvalidConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 值必須是允許的選項之一（不分大小寫）
pub fn validate_one_of(key: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.iter().any(|option| option.eq_ignore_ascii_case(value.trim())) {
        return Ok(());
    }
    Err(FaxError::InvalidConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("Expected one of: {}", allowed.join(", ")),
    })
}
