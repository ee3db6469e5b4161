use serde::Serialize;
use std::fs;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const EXIT_VALIDATION_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

const DEFAULT_LOG_FILTER: &str = "info";

/// Log to stderr at `info`; a set `RUST_LOG` replaces that level entirely.
pub fn init_tracing() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(rust_log.as_deref()))
        .init();
}

fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_LOG_FILTER),
    }
}

pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(EXIT_ERROR);
}

pub fn read_text_or_exit(path: &str, label: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("failed to read {label} at {path}: {e}")))
}

pub fn print_json(payload: &impl Serialize) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(format!("failed to render JSON output: {e}")),
    }
}

pub fn print_list_block(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {header}:");
    for item in items {
        println!("    - {item}");
    }
}
