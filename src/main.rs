use clap::Parser;
use faxkit::core::events::LoggingActionListener;
use faxkit::domain::ports::RequestParser;
use faxkit::utils::error::ErrorSeverity;
use faxkit::utils::{logger, validation::Validate};
use faxkit::{
    BackendRegistry, CliConfig, CommandLineRequestParser, FaxActionType, FaxClient, FaxError,
    FaxJob,
};
use std::sync::Arc;

async fn run(config: &CliConfig) -> faxkit::Result<()> {
    let builder = config.configuration_builder()?;
    let backend_key = config.backend_key(&builder)?;
    let registry = BackendRegistry::with_builtins();

    let mut client = FaxClient::from_builder(
        &registry,
        &backend_key,
        &builder,
        config.property_part.as_deref(),
    )?;
    client.add_listener(Arc::new(LoggingActionListener));

    let outcome = execute(&client, config).await;
    // 不論操作成功與否都釋放後端資源
    if let Err(e) = client.shutdown().await {
        tracing::warn!("⚠️ Backend shutdown failed: {}", e);
    }
    outcome
}

async fn execute(client: &FaxClient, config: &CliConfig) -> faxkit::Result<()> {
    let action = config.action()?;

    let mut job = match action {
        FaxActionType::Submit => {
            let (job, file) = CommandLineRequestParser::new().parse(&config.request)?;
            tracing::info!("📄 Sending {} ({} bytes) to {}", file.name, file.content.len(), job.target_address);
            job
        }
        _ => {
            let mut job = client.create_job();
            job.id = config.job_id.clone();
            job
        }
    };

    match action {
        FaxActionType::Submit => {
            client.submit(&mut job).await?;
            print_job(&job);
        }
        FaxActionType::Suspend => client.suspend(&mut job).await?,
        FaxActionType::Resume => client.resume(&mut job).await?,
        FaxActionType::Cancel => client.cancel(&mut job).await?,
        FaxActionType::GetStatus => {
            client.get_status(&mut job).await?;
            print_job(&job);
        }
    }

    println!("✅ {} completed", action);
    Ok(())
}

fn print_job(job: &FaxJob) {
    println!("📠 Fax job id: {}", job.id.as_deref().unwrap_or("-"));
    println!("📊 Status: {}", job.status);
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting faxkit CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    if let Err(e) = run(&config).await {
        tracing::error!("❌ Fax operation failed: {} (Severity: {:?})", e, e.severity());
        exit_with(&e);
    }
}

fn exit_with(error: &FaxError) -> ! {
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
