use crate::config::{defaults, ConfigLayer, ConfigurationBuilder};
use crate::domain::model::FaxActionType;
use crate::utils::error::{FaxError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "faxkit")]
#[command(about = "Submit and manage fax jobs through a configurable backend")]
pub struct CliConfig {
    /// TOML 部署配置檔
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// 後端註冊鍵，未指定時讀取 faxkit.backend
    #[arg(long, short = 'b')]
    pub backend: Option<String>,

    #[arg(long)]
    pub property_part: Option<String>,

    /// 覆蓋配置值，可重複：--set faxkit.http.http.url=http://...
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    #[arg(long, short = 'a', default_value = "submit")]
    pub action: String,

    /// submit 以外的操作需要的傳真工作 id
    #[arg(long)]
    pub job_id: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    /// 傳真請求參數，例如 -target_address:123 -file:doc.pdf
    #[arg(last = true, allow_hyphen_values = true)]
    pub request: Vec<String>,
}

impl CliConfig {
    pub fn action(&self) -> Result<FaxActionType> {
        self.action.parse()
    }

    /// `--set` 組成的最高優先層
    pub fn override_layer(&self) -> Result<ConfigLayer> {
        let mut layer = ConfigLayer::new();
        for entry in &self.overrides {
            let (key, value) = entry.split_once('=').ok_or_else(|| FaxError::ConfigError {
                message: format!("Override must be KEY=VALUE: {}", entry),
            })?;
            validate_non_empty_string("--set", key)?;
            layer.insert(key.trim().to_string(), value.to_string());
        }
        Ok(layer)
    }

    pub fn configuration_builder(&self) -> Result<ConfigurationBuilder> {
        let mut builder = ConfigurationBuilder::new();
        if let Some(path) = &self.config {
            builder = builder.with_file(path)?;
        }
        Ok(builder.with_layer(self.override_layer()?))
    }

    /// 命令列優先，其次是配置中的 faxkit.backend
    pub fn backend_key(&self, builder: &ConfigurationBuilder) -> Result<String> {
        match &self.backend {
            Some(backend) => Ok(backend.trim().to_string()),
            None => builder
                .build(None)
                .require(defaults::BACKEND)
                .map(str::to_string),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let action = self.action()?;
        self.override_layer()?;

        if let Some(backend) = &self.backend {
            validate_non_empty_string("--backend", backend)?;
        }

        match action {
            FaxActionType::Submit if self.request.is_empty() => Err(FaxError::ValidationError {
                message: "submit needs request arguments after --".to_string(),
            }),
            FaxActionType::Submit => Ok(()),
            _ if self.job_id.as_deref().is_none_or(|id| id.trim().is_empty()) => {
                Err(FaxError::InvalidStateError {
                    action,
                    message: "--job-id is required".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::parse_from(std::iter::once("faxkit").chain(args.iter().copied()))
    }

    #[test]
    fn test_submit_with_request_args() {
        let config = parse(&[
            "--backend",
            "process",
            "--set",
            "faxkit.process.submit.command=echo ok",
            "--",
            "-target_address:123",
            "-file_content:hi",
        ]);

        assert!(config.validate().is_ok());
        assert_eq!(config.action().unwrap(), FaxActionType::Submit);
        assert_eq!(config.request, vec!["-target_address:123", "-file_content:hi"]);

        let layer = config.override_layer().unwrap();
        assert_eq!(
            layer.get("faxkit.process.submit.command").map(String::as_str),
            Some("echo ok")
        );
    }

    #[test]
    fn test_status_requires_job_id() {
        let config = parse(&["--action", "status"]);
        assert!(matches!(
            config.validate(),
            Err(FaxError::InvalidStateError { .. })
        ));

        let config = parse(&["--action", "status", "--job-id", "fax-1"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_override_rejected() {
        let config = parse(&["--set", "no-equals-sign", "--", "-file_content:x"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_key_from_configuration() {
        let config = parse(&["--set", "faxkit.backend=http"]);
        let builder = config.configuration_builder().unwrap();
        assert_eq!(config.backend_key(&builder).unwrap(), "http");
    }
}
