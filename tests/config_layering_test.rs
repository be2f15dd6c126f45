use anyhow::Result;
use faxkit::config::toml_config;
use faxkit::{BackendRegistry, ConfigurationBuilder, FaxClient, FaxError};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_defaults_file_and_overrides_precedence() -> Result<()> {
    let file = write_config(
        r#"
[faxkit]
backend = "http"

[faxkit."{0}".http]
url = "http://file.example/send"
"timeout.ms" = "1500"

[faxkit.shared.http]
url = "http://literal.example/send"
"#,
    )?;

    let overrides = HashMap::from([(
        "faxkit.{0}.http.timeout.ms".to_string(),
        "2500".to_string(),
    )]);
    let builder = ConfigurationBuilder::new()
        .with_file(file.path())?
        .with_layer(overrides);

    let primary = builder.build(Some("primary"));
    assert_eq!(primary.get("faxkit.backend"), Some("http"));
    assert_eq!(primary.get("faxkit.primary.http.url"), Some("http://file.example/send"));
    assert_eq!(primary.get("faxkit.primary.http.timeout.ms"), Some("2500"));
    // 內建預設值
    assert_eq!(primary.get("faxkit.primary.http.request.type"), Some("multipart"));

    // 同層的字面鍵優先於展開後的模板鍵
    let shared = builder.build(Some("shared"));
    assert_eq!(shared.get("faxkit.shared.http.url"), Some("http://literal.example/send"));
    Ok(())
}

#[test]
fn test_env_substitution_in_file() -> Result<()> {
    std::env::set_var("FAXKIT_TEST_GATEWAY", "gateway.internal");
    let layer = toml_config::parse_toml_str(
        r#"
[faxkit.gw.http]
url = "https://${FAXKIT_TEST_GATEWAY}/fax"
"status.url" = "https://${FAXKIT_TEST_GATEWAY}/fax/${fax.job.id}"
"#,
    )?;

    assert_eq!(
        layer.get("faxkit.gw.http.url").map(String::as_str),
        Some("https://gateway.internal/fax")
    );
    // 小寫的模板標記不會被當成環境變數
    assert_eq!(
        layer.get("faxkit.gw.http.status.url").map(String::as_str),
        Some("https://gateway.internal/fax/${fax.job.id}")
    );
    Ok(())
}

#[test]
fn test_override_can_blank_out_a_setting() -> Result<()> {
    let builder = ConfigurationBuilder::new()
        .with_toml_str("[faxkit.\"{0}\".http]\nurl = \"http://fax.example/send\"\n")?
        .with_layer(HashMap::from([(
            "faxkit.{0}.http.url".to_string(),
            "  ".to_string(),
        )]));

    let err = FaxClient::from_builder(&BackendRegistry::with_builtins(), "http", &builder, None)
        .err()
        .unwrap();
    match err {
        FaxError::MissingConfigError { key } => assert_eq!(key, "faxkit.http.http.url"),
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_property_part_from_configuration() -> Result<()> {
    let builder = ConfigurationBuilder::new().with_toml_str(
        r#"
[faxkit]
"property.part" = "office"

[faxkit.office.http]
url = "http://office.example/send"
"#,
    )?;

    let client = FaxClient::from_builder(&BackendRegistry::with_builtins(), "http", &builder, None)?;
    assert_eq!(client.configuration().property_part(), Some("office"));
    assert_eq!(
        client.configuration().get("faxkit.office.http.url"),
        Some("http://office.example/send")
    );
    Ok(())
}

#[test]
fn test_unknown_backend_is_configuration_error() {
    let builder = ConfigurationBuilder::new();
    let err = FaxClient::from_builder(&BackendRegistry::with_builtins(), "modem", &builder, None)
        .err()
        .unwrap();
    assert!(err.is_configuration_error());
}
