//! 指令／請求模板：以傳真工作欄位與額外屬性代入 `${token}` 佔位符。

use crate::config::Configuration;
use crate::domain::model::{FaxJob, FaxJobPriority};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder pattern"));

pub const TARGET_ADDRESS: &str = "target.address";
pub const TARGET_NAME: &str = "target.name";
pub const SENDER_NAME: &str = "sender.name";
pub const SENDER_FAX_NUMBER: &str = "sender.fax.number";
pub const SENDER_EMAIL: &str = "sender.email";
pub const FILE: &str = "file";
pub const FAX_JOB_ID: &str = "fax.job.id";
pub const PRIORITY: &str = "priority";

/// 預設對應到請求欄位的標記
pub const STANDARD_TOKENS: [&str; 7] = [
    TARGET_ADDRESS,
    TARGET_NAME,
    SENDER_NAME,
    SENDER_FAX_NUMBER,
    SENDER_EMAIL,
    FILE,
    FAX_JOB_ID,
];

/// 計算模板綁定值
///
/// 優先順序：額外屬性 < `job.properties` < 非空的工作欄位。
pub fn bindings(job: &FaxJob, extra: &HashMap<String, String>) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = extra
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (key, value) in &job.properties {
        if !key.trim().is_empty() {
            values.insert(key.clone(), value.clone());
        }
    }

    let file = job
        .file_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();

    let fields = [
        (TARGET_ADDRESS, job.target_address.as_str()),
        (TARGET_NAME, job.target_name.as_str()),
        (SENDER_NAME, job.sender_name.as_str()),
        (SENDER_FAX_NUMBER, job.sender_fax_number.as_str()),
        (SENDER_EMAIL, job.sender_email.as_str()),
        (FILE, file.as_str()),
        (FAX_JOB_ID, job.id.as_deref().unwrap_or_default()),
        (PRIORITY, priority_name(job.priority)),
    ];
    for (token, value) in fields {
        if !value.is_empty() {
            values.insert(token.to_string(), value.to_string());
        }
    }

    values
}

fn priority_name(priority: FaxJobPriority) -> &'static str {
    match priority {
        FaxJobPriority::Low => "LOW",
        FaxJobPriority::Normal => "NORMAL",
        FaxJobPriority::High => "HIGH",
        FaxJobPriority::Urgent => "URGENT",
    }
}

/// 以工作與額外屬性渲染模板，未綁定的佔位符渲染為空字串
pub fn render(template: &str, job: &FaxJob, extra: &HashMap<String, String>) -> String {
    render_with(template, &bindings(job, extra))
}

pub fn render_with(template: &str, values: &BTreeMap<String, String>) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            values.get(caps[1].trim()).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// 模板中出現的所有標記（依出現順序，不重複）
pub fn placeholders(template: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_PATTERN.captures_iter(template) {
        let token = caps[1].trim().to_string();
        if !found.contains(&token) {
            found.push(token);
        }
    }
    found
}

/// 邏輯標記到後端欄位名稱的對應
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNameMapping {
    names: BTreeMap<String, String>,
}

impl PartNameMapping {
    /// 標準標記對應到同名欄位
    pub fn identity() -> Self {
        Self {
            names: STANDARD_TOKENS
                .iter()
                .map(|token| (token.to_string(), token.to_string()))
                .collect(),
        }
    }

    /// 以 `prefix` 下的配置覆蓋或新增對應，例如 `faxkit.{0}.http.part.target.address = "To"`
    pub fn from_config(config: &Configuration, prefix_template: &str) -> Self {
        let mut mapping = Self::identity();
        for (token, wire_name) in config.with_prefix(&config.part_key(prefix_template)) {
            mapping.names.insert(token, wire_name.trim().to_string());
        }
        mapping
    }

    pub fn with(mut self, token: &str, wire_name: &str) -> Self {
        self.names.insert(token.to_string(), wire_name.to_string());
        self
    }

    pub fn wire_name<'a>(&'a self, token: &'a str) -> &'a str {
        self.names.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// 多部分請求中的一個欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPart {
    pub token: String,
    pub name: String,
    pub value: String,
}

/// 為每個有值的已對應標記產生一個欄位，依標記名稱排序
pub fn render_parts(
    job: &FaxJob,
    mapping: &PartNameMapping,
    extra: &HashMap<String, String>,
) -> Vec<RequestPart> {
    let values = bindings(job, extra);
    mapping
        .names
        .iter()
        .filter_map(|(token, wire_name)| {
            values
                .get(token)
                .filter(|value| !value.is_empty())
                .map(|value| RequestPart {
                    token: token.clone(),
                    name: wire_name.clone(),
                    value: value.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_job() -> FaxJob {
        let mut job = FaxJob::new();
        job.target_address = "12345".to_string();
        job.file_path = Some(PathBuf::from("test.txt"));
        job
    }

    #[test]
    fn test_render_submit_command() {
        let rendered = render(
            "submit target.address=${target.address} file=${file}",
            &sample_job(),
            &HashMap::new(),
        );
        assert_eq!(rendered, "submit target.address=12345 file=test.txt");
    }

    #[test]
    fn test_unbound_placeholder_renders_empty() {
        let rendered = render("to=${target.name}|${no.such.token}|", &sample_job(), &HashMap::new());
        assert_eq!(rendered, "to=||");
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let job = sample_job();
        let extra = HashMap::from([("modem".to_string(), "/dev/ttyS0".to_string())]);
        let template = "efax -d ${modem} -t ${target.address} ${file}";

        assert_eq!(render(template, &job, &extra), render(template, &job, &extra));
    }

    #[test]
    fn test_binding_precedence() {
        let mut job = sample_job();
        job.set_property("modem", "/dev/ttyUSB1");
        job.set_property("target.address", "999");
        let extra = HashMap::from([
            ("modem".to_string(), "/dev/ttyS0".to_string()),
            ("sender.name".to_string(), "Front Desk".to_string()),
        ]);

        let values = bindings(&job, &extra);
        assert_eq!(values.get("modem").unwrap(), "/dev/ttyUSB1");
        assert_eq!(values.get("target.address").unwrap(), "12345");
        assert_eq!(values.get("sender.name").unwrap(), "Front Desk");
        assert_eq!(values.get("priority").unwrap(), "NORMAL");
    }

    #[test]
    fn test_job_id_token() {
        let mut job = sample_job();
        assert!(!bindings(&job, &HashMap::new()).contains_key(FAX_JOB_ID));
        job.id = Some("77".to_string());
        assert_eq!(render("/faxes/${fax.job.id}", &job, &HashMap::new()), "/faxes/77");
    }

    #[test]
    fn test_placeholders_listed_once() {
        assert_eq!(
            placeholders("${a} ${ b } ${a}"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_render_parts_uses_wire_names_and_skips_unbound() {
        let mut job = sample_job();
        job.sender_email = "ops@example.com".to_string();
        job.set_property("cover.page", "yes");

        let mapping = PartNameMapping::identity()
            .with(TARGET_ADDRESS, "To")
            .with("cover.page", "CoverPage");

        let parts = render_parts(&job, &mapping, &HashMap::new());
        let names: Vec<_> = parts.iter().map(|p| p.name.as_str()).collect();

        // 依標記名稱排序：cover.page, file, sender.email, target.address
        assert_eq!(names, vec!["CoverPage", "file", "sender.email", "To"]);
        assert_eq!(parts[3].value, "12345");
    }

    #[test]
    fn test_mapping_from_config() {
        let config = Configuration::from_pairs(
            [
                ("faxkit.{0}.http.part.target.address", "fax_number"),
                ("faxkit.{0}.http.part.file", "document"),
            ],
            Some("acme"),
        );

        let mapping = PartNameMapping::from_config(&config, "faxkit.{0}.http.part.");
        assert_eq!(mapping.wire_name(TARGET_ADDRESS), "fax_number");
        assert_eq!(mapping.wire_name(FILE), "document");
        assert_eq!(mapping.wire_name(SENDER_NAME), "sender.name");
    }
}
