#[cfg(feature = "cli")]
pub mod cli;
pub mod defaults;
pub mod toml_config;

use crate::utils::error::{FaxError, Result};
use defaults::PROPERTY_PART_MARKER;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

/// 單一配置層：扁平的字串鍵值對
pub type ConfigLayer = HashMap<String, String>;

/// 合併後的有效配置，建立後唯讀
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: HashMap<String, String>,
    property_part: Option<String>,
}

/// 依優先順序合併配置層（後面的層覆蓋前面的層）
///
/// 含 `{0}` 的鍵先以 `property_part` 展開；沒有 property part 時這些鍵會被丟棄。
/// 同一層內，字面鍵優先於展開後撞名的模板鍵。
pub fn resolve(layers: &[ConfigLayer], property_part: Option<&str>) -> Configuration {
    let part = property_part
        .map(str::trim)
        .filter(|part| !part.is_empty());

    let mut values = HashMap::new();
    for layer in layers {
        let (templated, literal): (Vec<_>, Vec<_>) = layer
            .iter()
            .partition(|(key, _)| key.contains(PROPERTY_PART_MARKER));

        for (key, value) in templated {
            if let Some(part) = part {
                values.insert(key.replace(PROPERTY_PART_MARKER, part), value.clone());
            }
        }
        for (key, value) in literal {
            values.insert(key.clone(), value.clone());
        }
    }

    Configuration {
        values,
        property_part: part.map(str::to_string),
    }
}

impl Configuration {
    /// 由單一層建立（主要用於測試與程式內配置）
    pub fn from_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
        property_part: Option<&str>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let layer: ConfigLayer = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        resolve(&[layer], property_part)
    }

    pub fn property_part(&self) -> Option<&str> {
        self.property_part.as_deref()
    }

    /// 讀取值；空白值視為未設定
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| FaxError::MissingConfigError {
            key: key.to_string(),
        })
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(FaxError::InvalidConfigValueError {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "Expected a boolean (true/false)".to_string(),
                }),
            },
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|e| FaxError::InvalidConfigValueError {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: format!("Expected a non-negative integer: {}", e),
                }),
        }
    }

    /// 以本實例的 property part 展開模板鍵
    pub fn part_key(&self, template: &str) -> String {
        match &self.property_part {
            Some(part) => template.replace(PROPERTY_PART_MARKER, part),
            None => template.to_string(),
        }
    }

    pub fn get_part(&self, template: &str) -> Option<&str> {
        self.get(&self.part_key(template))
    }

    pub fn require_part(&self, template: &str) -> Result<&str> {
        self.require(&self.part_key(template))
    }

    /// 取得指定前綴下的所有鍵（已去除前綴），依鍵排序
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.values
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 依序收集配置層：內建預設值 < 部署檔案 < 呼叫者覆蓋
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    layers: Vec<ConfigLayer>,
}

impl ConfigurationBuilder {
    /// 以內建預設值作為第一層
    pub fn new() -> Self {
        Self {
            layers: vec![defaults::default_layer()],
        }
    }

    /// 不含內建預設值
    pub fn empty() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.layers.push(toml_config::load_file(path)?);
        Ok(self)
    }

    pub fn with_toml_str(mut self, content: &str) -> Result<Self> {
        self.layers.push(toml_config::parse_toml_str(content)?);
        Ok(self)
    }

    pub fn with_layer(mut self, layer: ConfigLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    pub fn build(&self, property_part: Option<&str>) -> Configuration {
        resolve(&self.layers, property_part)
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
