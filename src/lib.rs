mod commands;
mod database;
mod engine;
mod export;
mod models;
mod store;

pub use commands::{apply, Command, CommandOutput};
pub use database::Database;
pub use engine::{format_elapsed, EngineConfig, Stopwatch, StopwatchEngine, Theme};
pub use export::CsvExport;
pub use models::{EngineState, StopwatchView};
pub use store::StateStore;


/// Инициализация логирования: по умолчанию info (если RUST_LOG не задан),
/// чтобы [TIMER]/[STORE] были видны. Повторный вызов безопасен.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
