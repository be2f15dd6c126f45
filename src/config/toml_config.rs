use crate::config::ConfigLayer;
use crate::utils::error::{FaxError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// 只替換大寫環境變數名稱，`${target.address}` 之類的模板標記保持不變
static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

/// 從 TOML 檔案載入部署層配置
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<ConfigLayer> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| FaxError::ConfigError {
        message: format!("Cannot read configuration file '{}': {}", path.display(), e),
    })?;
    tracing::debug!("📁 Loaded configuration file: {}", path.display());
    parse_toml_str(&content)
}

/// 從 TOML 字串解析並攤平成 `a.b.c = value` 形式
pub fn parse_toml_str(content: &str) -> Result<ConfigLayer> {
    let processed_content = substitute_env_vars(content);

    let table: toml::Table =
        toml::from_str(&processed_content).map_err(|e| FaxError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })?;

    let mut layer = ConfigLayer::new();
    flatten("", &table, &mut layer)?;
    Ok(layer)
}

/// 替換環境變數 (例如 ${API_KEY})，未定義的變數保留原樣
fn substitute_env_vars(content: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut ConfigLayer) -> Result<()> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            toml::Value::Table(inner) => flatten(&full_key, inner, out)?,
            // 陣列以分號連接，與狀態集合的格式一致
            toml::Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| scalar_to_string(&full_key, item))
                    .collect::<Result<Vec<_>>>()?;
                out.insert(full_key, parts.join(";"));
            }
            other => {
                let text = scalar_to_string(&full_key, other)?;
                out.insert(full_key, text);
            }
        }
    }
    Ok(())
}

fn scalar_to_string(key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => Err(FaxError::InvalidConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            reason: "Nested arrays and tables inside arrays are not supported".to_string(),
        }),
    }
}
