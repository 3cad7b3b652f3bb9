use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("arxml_viewer=debug,info")
        } else {
            EnvFilter::new("arxml_viewer=info")
        }
    })
}

pub fn init_cli_logger(debug: bool) {
    tracing_subscriber::registry()
        .with(default_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(debug)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(debug)
                .compact(),
        )
        .init();
}

/// 批次報表使用 JSON 格式，方便交給其他工具處理
pub fn init_json_logger(debug: bool) {
    tracing_subscriber::registry()
        .with(default_filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
