//! 配置鍵與內建預設值。
//!
//! 含 `{0}` 的鍵會以後端實例的 property part 展開，含 `{action}` 的鍵先以
//! [`action_key`] 代入操作名稱。

use crate::config::ConfigLayer;
use crate::domain::model::FaxActionType;

pub const PROPERTY_PART_MARKER: &str = "{0}";
const ACTION_MARKER: &str = "{action}";

// 全域
pub const BACKEND: &str = "faxkit.backend";
pub const PROPERTY_PART: &str = "faxkit.property.part";
pub const MONITOR_POLLING_INTERVAL_MS: &str = "faxkit.monitor.polling.interval.ms";

// 每個後端實例
pub const PERSISTENT_CONNECTION: &str = "faxkit.{0}.persistent.connection";
pub const TEMP_DIR: &str = "faxkit.{0}.temp.dir";

// process 後端
pub const PROCESS_COMMAND: &str = "faxkit.{0}.{action}.command";
pub const PROCESS_TIMEOUT_MS: &str = "faxkit.{0}.process.timeout.ms";
pub const PROCESS_OUTPUT_FORMAT: &str = "faxkit.{0}.process.output.format";

// http 後端
pub const HTTP_URL: &str = "faxkit.{0}.http.url";
pub const HTTP_ACTION_URL: &str = "faxkit.{0}.http.{action}.url";
pub const HTTP_ACTION_METHOD: &str = "faxkit.{0}.http.{action}.method";
pub const HTTP_ACTION_TEMPLATE: &str = "faxkit.{0}.http.{action}.template";
pub const HTTP_REQUEST_TYPE: &str = "faxkit.{0}.http.request.type";
pub const HTTP_CONTENT_TYPE: &str = "faxkit.{0}.http.content.type";
pub const HTTP_PART_PREFIX: &str = "faxkit.{0}.http.part.";
pub const HTTP_HEADER_PREFIX: &str = "faxkit.{0}.http.header.";
pub const HTTP_TIMEOUT_MS: &str = "faxkit.{0}.http.timeout.ms";

// 回應分類
pub const RESPONSE_ERROR_PATH: &str = "faxkit.{0}.response.error.path";
pub const RESPONSE_ERROR_VALUE: &str = "faxkit.{0}.response.error.value";
pub const RESPONSE_ERROR_MATCH: &str = "faxkit.{0}.response.error.match";
pub const RESPONSE_ERROR_MESSAGE_PATH: &str = "faxkit.{0}.response.error.message.path";
pub const RESPONSE_SUBMIT_ID_PATH: &str = "faxkit.{0}.response.submit.id.path";
pub const RESPONSE_STATUS_PATH: &str = "faxkit.{0}.response.status.path";
pub const RESPONSE_STATUS_PENDING: &str = "faxkit.{0}.response.status.pending";
pub const RESPONSE_STATUS_IN_PROGRESS: &str = "faxkit.{0}.response.status.in_progress";
pub const RESPONSE_STATUS_ERROR: &str = "faxkit.{0}.response.status.error";

pub const DEFAULTS: &[(&str, &str)] = &[
    (MONITOR_POLLING_INTERVAL_MS, "5000"),
    (PERSISTENT_CONNECTION, "false"),
    (PROCESS_TIMEOUT_MS, "120000"),
    (PROCESS_OUTPUT_FORMAT, "text"),
    (HTTP_REQUEST_TYPE, "multipart"),
    (HTTP_CONTENT_TYPE, "application/json"),
    (HTTP_TIMEOUT_MS, "30000"),
    (RESPONSE_ERROR_MATCH, "equals"),
];

pub const DEFAULT_HTTP_METHOD: &str = "POST";

/// 內建預設值層
pub fn default_layer() -> ConfigLayer {
    DEFAULTS
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// 代入操作名稱：`faxkit.{0}.{action}.command` -> `faxkit.{0}.submit.command`
pub fn action_key(template: &str, action: FaxActionType) -> String {
    template.replace(ACTION_MARKER, action.config_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_key() {
        assert_eq!(
            action_key(PROCESS_COMMAND, FaxActionType::GetStatus),
            "faxkit.{0}.status.command"
        );
        assert_eq!(
            action_key(HTTP_ACTION_URL, FaxActionType::Cancel),
            "faxkit.{0}.http.cancel.url"
        );
    }

    #[test]
    fn test_default_layer_contains_all_defaults() {
        let layer = default_layer();
        assert_eq!(layer.len(), DEFAULTS.len());
        assert_eq!(layer.get(PERSISTENT_CONNECTION).map(String::as_str), Some("false"));
    }
}
