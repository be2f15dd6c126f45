#![cfg(unix)]

use anyhow::Result;
use faxkit::{
    BackendRegistry, ConfigurationBuilder, FaxActionType, FaxClient, FaxError, FaxJob,
    FaxJobStatus, FileInfo,
};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

fn client(pairs: &[(&str, &str)]) -> Result<FaxClient> {
    let layer: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let builder = ConfigurationBuilder::new().with_layer(layer);
    Ok(FaxClient::from_builder(
        &BackendRegistry::with_builtins(),
        "process",
        &builder,
        Some("shell"),
    )?)
}

fn job_with_file(path: &Path) -> FaxJob {
    let mut job = FaxJob::new();
    job.target_address = "12345".to_string();
    job.file_path = Some(path.to_path_buf());
    job
}

#[tokio::test]
async fn test_submit_renders_command_and_reads_id() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("test.txt");
    std::fs::write(&file, "hello")?;

    let client = client(&[
        (
            "faxkit.{0}.submit.command",
            "sh -c 'echo \"$0\" >&2; echo fax-$1' \"submit target.address=${target.address} file=${file}\" ${target.address}",
        ),
        ("faxkit.{0}.response.submit.id.path", "$"),
    ])?;
    let mut job = job_with_file(&file);

    client.submit(&mut job).await?;
    assert_eq!(job.id.as_deref(), Some("fax-12345"));
    Ok(())
}

#[tokio::test]
async fn test_nonzero_exit_is_backend_error_even_with_output() -> Result<()> {
    let client = client(&[
        ("faxkit.{0}.submit.command", "sh -c 'echo fax-1; echo no dial tone >&2; exit 3'"),
        ("faxkit.{0}.response.submit.id.path", "$"),
    ])?;
    let mut job = FaxJob::new();
    job.target_address = "12345".to_string();
    job.file_content = Some(FileInfo::new("a.txt", b"x".to_vec()));

    let err = client.submit(&mut job).await.unwrap_err();
    match &err {
        FaxError::BackendError { action, message, .. } => {
            assert_eq!(*action, FaxActionType::Submit);
            assert_eq!(message, "Exit code 3: no dial tone");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(job.id, None);
    Ok(())
}

#[tokio::test]
async fn test_json_status_output() -> Result<()> {
    let client = client(&[
        ("faxkit.{0}.status.command", r#"printf '{"job":{"id":"${fax.job.id}","state":"queued"}}'"#),
        ("faxkit.{0}.process.output.format", "json"),
        ("faxkit.{0}.response.status.path", "job.state"),
        ("faxkit.{0}.response.status.pending", "queued"),
    ])?;
    let mut job = FaxJob::new();
    job.id = Some("fax-9".to_string());

    assert_eq!(client.get_status(&mut job).await?, FaxJobStatus::Pending);
    assert!(!client.supports(FaxActionType::Submit));
    Ok(())
}

#[tokio::test]
async fn test_json_format_accepts_silent_or_plain_output() -> Result<()> {
    let client = client(&[
        ("faxkit.{0}.cancel.command", "true"),
        ("faxkit.{0}.resume.command", "echo OK"),
        ("faxkit.{0}.process.output.format", "json"),
    ])?;
    let mut job = FaxJob::new();
    job.id = Some("fax-4".to_string());

    client.cancel(&mut job).await?;
    client.resume(&mut job).await?;
    assert_eq!(job.id.as_deref(), Some("fax-4"));
    Ok(())
}

#[tokio::test]
async fn test_timeout_kills_command() -> Result<()> {
    let client = client(&[
        ("faxkit.{0}.cancel.command", "sleep 5"),
        ("faxkit.{0}.process.timeout.ms", "100"),
    ])?;
    let mut job = FaxJob::new();
    job.id = Some("fax-1".to_string());

    let started = std::time::Instant::now();
    let err = client.cancel(&mut job).await.unwrap_err();
    assert!(started.elapsed() < std::time::Duration::from_secs(4));

    match err {
        FaxError::BackendError { source: Some(source), .. } => {
            assert!(matches!(*source, FaxError::TimeoutError { timeout_ms: 100, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_in_memory_content_is_staged_and_removed() -> Result<()> {
    let dir = TempDir::new()?;
    let client = client(&[
        ("faxkit.{0}.submit.command", "sh -c 'cat \"$1\" >&2; echo \"$1\"' sh ${file}"),
        ("faxkit.{0}.response.submit.id.path", "$"),
        ("faxkit.{0}.temp.dir", dir.path().to_str().unwrap()),
    ])?;

    let mut job = FaxJob::new();
    job.target_address = "12345".to_string();
    job.file_content = Some(FileInfo::new("cover.txt", b"page one".to_vec()));

    client.submit(&mut job).await?;

    // 回傳的 id 就是暫存檔路徑
    let staged = job.id.clone().unwrap();
    assert!(staged.starts_with(dir.path().to_str().unwrap()));
    assert!(staged.ends_with("-cover.txt"));
    assert!(!Path::new(&staged).exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_program_is_backend_error() -> Result<()> {
    let client = client(&[("faxkit.{0}.suspend.command", "/no/such/faxtool ${fax.job.id}")])?;
    let mut job = FaxJob::new();
    job.id = Some("fax-1".to_string());

    let err = client.suspend(&mut job).await.unwrap_err();
    assert!(matches!(
        err,
        FaxError::BackendError { action: FaxActionType::Suspend, source: Some(_), .. }
    ));
    Ok(())
}
