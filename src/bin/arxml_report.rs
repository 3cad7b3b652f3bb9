use arxml_viewer::utils::{logger, validation::Validate};
use arxml_viewer::{ArxmlPipeline, JobConfig, LocalStorage, ViewerConfig, ViewerEngine};
use clap::Parser;
use std::path::Path;

#[derive(Parser)]
#[command(name = "arxml-report")]
#[command(about = "Batch export of ARXML files listed in a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "arxml-viewer.toml")]
    config: String,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match ViewerConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs || config.json_logs_enabled() {
        logger::init_json_logger(args.debug);
    } else {
        logger::init_cli_logger(args.debug);
    }

    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.input.files.is_empty() {
        eprintln!("⚠️ No input files listed under [input].files");
        return Ok(());
    }

    let jobs: Vec<JobConfig> = config
        .input
        .files
        .iter()
        .map(|file| job_for_file(&config, file))
        .collect();

    display_config_summary(&config, &jobs, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&jobs);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut failures = 0usize;
    for job in jobs {
        let input = job.input_path.clone();
        let storage = LocalStorage::new(".".to_string());
        let engine = ViewerEngine::new_with_monitoring(
            ArxmlPipeline::new(storage, job),
            monitor_enabled,
        );

        match engine.run().await {
            Ok(output_path) => {
                println!("✅ {} -> {}", input, output_path);
            }
            Err(e) => {
                failures += 1;
                tracing::error!(
                    "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                    input,
                    e,
                    e.category(),
                    e.severity()
                );
                eprintln!("❌ {}: {}", input, e.user_friendly_message());
                eprintln!("💡 {}", e.recovery_suggestion());
            }
        }
    }

    println!(
        "📊 Processed {} files, {} failed",
        config.input.files.len(),
        failures
    );
    if failures > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// 每個輸入檔輸出到以檔名命名的子目錄
fn job_for_file(config: &ViewerConfig, file: &str) -> JobConfig {
    let mut job = config.job_for(file);
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    job.output_path = Path::new(&job.output_path)
        .join(stem)
        .to_string_lossy()
        .into_owned();
    job
}

fn display_config_summary(config: &ViewerConfig, jobs: &[JobConfig], args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Files: {}", jobs.len());
    println!("  Output: {}", config.export.output_path);
    println!("  Formats: {}", config.export.formats.join(", "));
    if config.export.archive {
        println!("  Archive: {}", config.export.archive_name);
    }
    match config.layout.default_type {
        Some(layout) => println!("  Layout: {}", layout),
        None => println!("  Layout: auto"),
    }
    println!("  Max file size: {} MB", config.parser.max_file_size_mb);

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(jobs: &[JobConfig]) {
    println!("🔍 Dry Run Analysis:");
    for job in jobs {
        let path = Path::new(&job.input_path);
        let status = match std::fs::metadata(path) {
            Ok(meta) => format!("{:.2} MB", meta.len() as f64 / (1024.0 * 1024.0)),
            Err(_) => "❌ missing".to_string(),
        };
        println!("  {} ({})", job.input_path, status);
        match &job.archive_name {
            Some(name) => println!("    -> {}", Path::new(&job.output_path).join(name).display()),
            None => println!("    -> {}/", job.output_path),
        }
    }
    println!();
    println!("✅ Dry run completed - configuration is valid");
}
