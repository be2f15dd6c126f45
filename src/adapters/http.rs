//! 透過 HTTP API 執行傳真操作的後端。
//!
//! `reqwest::Client` 由連線池管理：persistent 時所有操作共用一個 client，
//! transient 時每次操作建立新的 client。

use crate::config::{defaults, Configuration};
use crate::core::classifier::{Classification, ResponseClassifier, ResponseEnvelope};
use crate::core::pool::{Connection, ConnectionPool, PoolPolicy};
use crate::core::template::{self, PartNameMapping};
use crate::domain::model::{Capabilities, FaxActionType, FaxJob, FaxJobStatus};
use crate::domain::ports::{ConnectionFactory, FaxBackend};
use crate::utils::error::{FaxError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

pub const BACKEND_KEY: &str = "http";

pub fn create_backend(config: &Configuration) -> Result<Arc<dyn FaxBackend>> {
    Ok(Arc::new(HttpBackend::from_config(config)?))
}

/// 請求內容的組成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// 每個已對應的標記一個欄位，submit 另附檔案
    Multipart,
    /// 以 `http.{action}.template` 渲染的文字內容
    Template,
}

enum RequestBody {
    Text(String),
    Form(Form),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpAction {
    pub url: String,
    pub method: Method,
    pub template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub property_part: String,
    pub actions: BTreeMap<FaxActionType, HttpAction>,
    pub request_type: RequestType,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
    pub persistent: bool,
    pub part_mapping: PartNameMapping,
}

impl HttpSettings {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let property_part = config.property_part().unwrap_or(BACKEND_KEY).to_string();

        let mut actions = BTreeMap::new();
        for action in FaxActionType::ALL {
            let url = config
                .get_part(&defaults::action_key(defaults::HTTP_ACTION_URL, action))
                .or_else(|| match action {
                    // 只有 submit 會退回共用的 http.url
                    FaxActionType::Submit => config.get_part(defaults::HTTP_URL),
                    _ => None,
                });
            let Some(url) = url else {
                continue;
            };

            let method_key = config.part_key(&defaults::action_key(defaults::HTTP_ACTION_METHOD, action));
            let method_name = config.get_or(&method_key, defaults::DEFAULT_HTTP_METHOD);
            let method = Method::from_bytes(method_name.trim().to_ascii_uppercase().as_bytes())
                .map_err(|e| FaxError::InvalidConfigValueError {
                    key: method_key.clone(),
                    value: method_name.to_string(),
                    reason: e.to_string(),
                })?;

            actions.insert(
                action,
                HttpAction {
                    url: url.trim().to_string(),
                    method,
                    template: config
                        .get_part(&defaults::action_key(defaults::HTTP_ACTION_TEMPLATE, action))
                        .map(str::to_string),
                },
            );
        }

        let type_key = config.part_key(defaults::HTTP_REQUEST_TYPE);
        let type_name = config.get_or(&type_key, "multipart");
        validation::validate_one_of(&type_key, type_name, &["multipart", "template"])?;
        let request_type = if type_name.trim().eq_ignore_ascii_case("template") {
            RequestType::Template
        } else {
            RequestType::Multipart
        };

        let settings = Self {
            actions,
            request_type,
            content_type: config
                .get_part(defaults::HTTP_CONTENT_TYPE)
                .unwrap_or("application/json")
                .to_string(),
            headers: config.with_prefix(&config.part_key(defaults::HTTP_HEADER_PREFIX)),
            timeout_ms: config.get_u64(&config.part_key(defaults::HTTP_TIMEOUT_MS), 30_000)?,
            persistent: config.get_bool(&config.part_key(defaults::PERSISTENT_CONNECTION), false)?,
            part_mapping: PartNameMapping::from_config(config, defaults::HTTP_PART_PREFIX),
            property_part,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn key(&self, template: &str) -> String {
        template.replace(defaults::PROPERTY_PART_MARKER, &self.property_part)
    }
}

impl Validate for HttpSettings {
    fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(FaxError::MissingConfigError {
                key: self.key(defaults::HTTP_URL),
            });
        }
        for (action, settings) in &self.actions {
            let key = self.key(&defaults::action_key(defaults::HTTP_ACTION_URL, *action));
            validation::validate_url(&key, &settings.url)?;
        }
        if self.request_type == RequestType::Template {
            if let Some(submit) = self.actions.get(&FaxActionType::Submit) {
                if submit.template.is_none() {
                    return Err(FaxError::MissingConfigError {
                        key: self.key(&defaults::action_key(
                            defaults::HTTP_ACTION_TEMPLATE,
                            FaxActionType::Submit,
                        )),
                    });
                }
            }
        }
        validation::validate_positive_number(&self.key(defaults::HTTP_TIMEOUT_MS), self.timeout_ms, 1)
    }
}

/// 建立具逾時設定的 HTTP client
struct HttpClientFactory {
    timeout: Duration,
}

#[async_trait]
impl ConnectionFactory<Client> for HttpClientFactory {
    async fn create(&self) -> Result<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }

    async fn destroy(&self, _resource: &Client) -> Result<()> {
        Ok(())
    }
}

pub struct HttpBackend {
    settings: HttpSettings,
    classifier: ResponseClassifier,
    pool: ConnectionPool<Client>,
}

impl HttpBackend {
    pub fn new(settings: HttpSettings, classifier: ResponseClassifier) -> Self {
        let factory = Arc::new(HttpClientFactory {
            timeout: Duration::from_millis(settings.timeout_ms),
        });
        Self::with_factory(settings, classifier, factory)
    }

    /// 以自訂的 client 工廠建立，例如共用 TLS 設定或代理
    pub fn with_factory(
        settings: HttpSettings,
        classifier: ResponseClassifier,
        factory: Arc<dyn ConnectionFactory<Client>>,
    ) -> Self {
        let pool = ConnectionPool::new(PoolPolicy::from_persistent_flag(settings.persistent), factory);
        Self {
            settings,
            classifier,
            pool,
        }
    }

    pub fn from_config(config: &Configuration) -> Result<Self> {
        let settings = HttpSettings::from_config(config)?;
        let classifier = ResponseClassifier::from_config(config)?;
        tracing::debug!(
            "🌐 HTTP backend '{}' configured for: {:?} ({:?} connection)",
            settings.property_part,
            settings.actions.keys().collect::<Vec<_>>(),
            PoolPolicy::from_persistent_flag(settings.persistent)
        );
        Ok(Self::new(settings, classifier))
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    async fn execute(&self, action: FaxActionType, job: &FaxJob) -> Result<Classification> {
        let endpoint = self
            .settings
            .actions
            .get(&action)
            .ok_or_else(|| FaxError::unsupported(action, self.name()))?;

        let mut extra = HashMap::new();
        if let Some(file) = &job.file_content {
            extra.insert("file.name".to_string(), file.name.clone());
        }
        let values = template::bindings(job, &extra);
        let url = template::render_with(&endpoint.url, &values);

        let headers: Vec<(String, String)> = self
            .settings
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), template::render_with(value, &values)))
            .collect();

        // 請求內容在取得連線前組好，失敗時不會占用連線
        let body = match self.settings.request_type {
            RequestType::Template => endpoint
                .template
                .as_ref()
                .map(|body| RequestBody::Text(template::render_with(body, &values))),
            RequestType::Multipart if endpoint.method != Method::GET => {
                Some(RequestBody::Form(self.build_form(action, job, &extra).await?))
            }
            RequestType::Multipart => None,
        };

        let connection = self.pool.acquire().await?;
        let mut request = connection.request(endpoint.method.clone(), url.as_str());

        // 添加自定義標頭
        for (name, value) in headers {
            request = request.header(name, value);
        }
        match body {
            Some(RequestBody::Text(text)) => {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, self.settings.content_type.as_str())
                    .body(text);
            }
            Some(RequestBody::Form(form)) => request = request.multipart(form),
            None => {}
        }

        tracing::debug!("🌐 {} {} {}", action, endpoint.method, url);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.discard(connection).await;
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.discard(connection).await;
                return Err(e.into());
            }
        };
        self.pool.release(connection).await?;
        tracing::debug!("🌐 {} response status: {}", action, status);

        if !status.is_success() {
            return Err(FaxError::backend(
                action,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        let envelope = ResponseEnvelope::from_body(body);
        self.classifier.classify(&envelope, action).into_result(action)
    }

    /// 傳輸失敗後作廢連線；作廢本身的錯誤只記錄，保留原本的傳輸錯誤
    async fn discard(&self, connection: Connection<Client>) {
        if let Err(e) = self.pool.invalidate(connection).await {
            tracing::warn!("⚠️ Failed to invalidate HTTP connection: {}", e);
        }
    }

    async fn build_form(
        &self,
        action: FaxActionType,
        job: &FaxJob,
        extra: &HashMap<String, String>,
    ) -> Result<Form> {
        let mut form = Form::new();
        for part in template::render_parts(job, &self.settings.part_mapping, extra) {
            if part.token == template::FILE {
                continue;
            }
            form = form.text(part.name, part.value);
        }

        if action == FaxActionType::Submit {
            let file = job.resolve_file().await?;
            let name = self.settings.part_mapping.wire_name(template::FILE).to_string();
            form = form.part(name, Part::bytes(file.content).file_name(file.name));
        }
        Ok(form)
    }
}

#[async_trait]
impl FaxBackend for HttpBackend {
    fn name(&self) -> &str {
        BACKEND_KEY
    }

    fn property_part(&self) -> &str {
        &self.settings.property_part
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::from_actions(self.settings.actions.keys().copied())
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

    async fn shutdown(&self) -> Result<()> {
        self.pool.shutdown().await
    }
}
