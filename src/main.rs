use arxml_viewer::core::filter::{Filter, FilterManager, QUICK_FILTERS};
use arxml_viewer::core::layout::LayoutEngine;
use arxml_viewer::core::navigation::Navigator;
use arxml_viewer::core::search::SearchEngine;
use arxml_viewer::core::AnalysisResult;
use arxml_viewer::domain::model::Package;
use arxml_viewer::utils::error::ErrorSeverity;
use arxml_viewer::utils::{logger, validation::Validate};
use arxml_viewer::{
    ArxmlModel, ArxmlPipeline, CliConfig, LocalStorage, ViewerConfig, ViewerEngine, ViewerError,
};
use clap::Parser;
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .or_else(ViewerConfig::default_config_path);
    let mut config = match &config_path {
        Some(path) => ViewerConfig::load_or_default(path)?,
        None => ViewerConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    if config.json_logs_enabled() {
        logger::init_json_logger(cli.debug);
    } else {
        logger::init_cli_logger(cli.debug);
    }

    tracing::info!("Starting arxml-viewer");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let Some(file) = cli.file.clone() else {
        print_welcome(&config);
        return Ok(());
    };

    if config.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&cli, &config, &file).await {
        Ok(()) => {
            config.add_recent_file(&file);
            if let Some(path) = &config_path {
                if let Err(e) = config.save_recent_files(path) {
                    tracing::warn!("⚠️ Could not update recent files: {}", e);
                }
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Failed to open {}: {} (Category: {:?}, Severity: {:?})",
                file,
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &ViewerConfig, file: &str) -> Result<(), ViewerError> {
    let storage = LocalStorage::new(".".to_string());
    let pipeline = ArxmlPipeline::new(storage, config.job_for(file));
    let engine = ViewerEngine::new_with_monitoring(pipeline, config.monitoring_enabled());

    let result = engine.open().await?;
    let model = &result.model;

    print_summary(&result);

    if cli.tree {
        println!("\n📁 Package tree");
        for package in &model.packages {
            print_package(package, 0);
        }
    }

    if cli.interfaces {
        for interface in &model.interfaces {
            println!("\n{}", interface.generate_documentation());
        }
    }

    if let Some(query) = &cli.search {
        print_search(model, config, query);
    }

    if !cli.filter.is_empty() {
        print_filtered(model, &cli.filter);
    }

    if cli.layout.is_some() {
        print_layout(&result);
    }

    if let Some(path) = &cli.goto {
        print_navigation(model, path);
    }

    if cli.export.is_some() {
        let output_path = engine.export(&result).await?;
        println!("\n✅ Export saved to: {}", output_path);
    }

    engine.monitor().log_final_stats();
    Ok(())
}

fn print_welcome(config: &ViewerConfig) {
    println!("ARXML Viewer - pass an .arxml file to open it (see --help)");

    let info = LayoutEngine::new(config.layout.parameters.clone()).layout_info();
    println!("\n📐 Available layouts: {}", info.available_layouts.join(", "));

    if config.recent.files.is_empty() {
        println!("\nNo recent files");
    } else {
        println!("\nRecent files:");
        for (i, file) in config.recent.files.iter().enumerate() {
            println!("  {}. {}", i + 1, file);
        }
    }
}

fn print_summary(result: &AnalysisResult) {
    let model = &result.model;
    let stats = model.statistics();

    println!("📊 {}", model.metadata.file_path);
    println!("  AUTOSAR version: {}", model.metadata.autosar_version);
    println!(
        "  Packages: {}  Components: {}  Ports: {}",
        stats.packages_parsed, stats.components_parsed, stats.ports_parsed
    );
    println!(
        "  Interfaces: {}  Connections: {}  Unresolved references: {}",
        stats.interfaces_parsed, stats.connections_parsed, stats.unresolved_references
    );
    println!("  Parse time: {:.1}ms", stats.parse_time_ms);

    for (component_type, count) in model.component_type_counts() {
        println!("  {:<40} {}", component_type, count);
    }
    println!(
        "  Layout: {} ({} positioned)",
        result.layout.layout_type,
        result.layout.positions.len()
    );
}

fn print_package(package: &Package, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}📁 {}", indent, package.short_name);
    for component in &package.components {
        println!(
            "{}  • {} [{}] ({} ports)",
            indent,
            component.short_name,
            component.component_type,
            component.port_count()
        );
    }
    for sub in &package.sub_packages {
        print_package(sub, depth + 1);
    }
}

fn print_search(model: &ArxmlModel, config: &ViewerConfig, query: &str) {
    let mut search = SearchEngine::with_case_sensitivity(config.search.case_sensitive);
    search.build_index(model);

    let results = search.search(
        query,
        config.search.default_scope,
        config.search.default_mode,
        config.search.max_results,
    );

    println!("\n🔍 {} results for '{}'", results.len(), query);
    for result in &results {
        println!(
            "  {:.2}  {:<10} {:<30} {}",
            result.relevance_score,
            result.item_type.as_str(),
            result.item_name,
            result.parent_package.as_deref().unwrap_or("")
        );
    }

    if results.is_empty() && config.search.wants_suggestions(query) {
        let suggestions = search.suggestions(query, 5);
        if !suggestions.is_empty() {
            println!("💡 Did you mean: {}", suggestions.join(", "));
        }
    }
}

fn print_filtered(model: &ArxmlModel, expressions: &[String]) {
    let mut manager = FilterManager::new();
    for expression in expressions {
        if QUICK_FILTERS.contains(&expression.as_str()) {
            manager.apply_quick_filter(expression);
            continue;
        }
        match expression.parse::<Filter>() {
            Ok(filter) => manager.add_filter(expression.clone(), filter),
            Err(e) => tracing::warn!("⚠️ Ignoring filter: {}", e),
        }
    }

    let components = model.all_components();
    let filtered = manager.filter_components(components.iter().copied());
    let stats = FilterManager::filtered_statistics(components.len(), filtered.len());

    println!(
        "\n🔍 Filters: {} ({} of {} components, {:.0}% remaining)",
        manager.active_filter_names().join(", "),
        filtered.len(),
        components.len(),
        stats.percentage_remaining
    );
    for component in filtered {
        println!("  • {} [{}]", component.short_name, component.component_type);
    }

    let ports = components.iter().copied().flat_map(|c| c.all_ports());
    let filtered_ports = manager.filter_ports(ports);
    if !filtered_ports.is_empty() {
        println!("  Matching ports: {}", filtered_ports.len());
        for port in filtered_ports {
            println!("  • {} [{}]", port.short_name, port.port_type);
        }
    }
}

fn print_layout(result: &AnalysisResult) {
    let model = &result.model;
    println!("\n📐 {} layout", result.layout.layout_type);
    if result.layout.positions.is_empty() {
        println!("  (no components)");
        return;
    }
    for (uuid, position) in &result.layout.positions {
        let name = model
            .find_component(uuid)
            .map(|c| c.short_name.as_str())
            .unwrap_or(uuid.as_str());
        println!("  {:<30} ({:>7.1}, {:>7.1})", name, position.x, position.y);
    }
    if let Some((min_x, min_y, max_x, max_y)) = result.layout.bounds() {
        println!(
            "  Bounds: ({:.1}, {:.1}) - ({:.1}, {:.1})",
            min_x, min_y, max_x, max_y
        );
    }
}

fn print_navigation(model: &ArxmlModel, path: &str) {
    let mut navigator = Navigator::new(model);
    if !navigator.navigate_to_package(path, true) {
        println!("\n⚠️ Package not found: {}", path);
        return;
    }

    println!("\n📁 {}", navigator.breadcrumb().join(" > "));
    if let Some(package) = navigator.current_package() {
        for sub in &package.sub_packages {
            println!("  📁 {}", sub.short_name);
        }
        for component in &package.components {
            println!("  • {} [{}]", component.short_name, component.component_type);
        }
    }
}
