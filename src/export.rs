use crate::engine::{format_elapsed, StopwatchEngine};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

/// Готовый CSV-экспорт: хост сам решает, куда его записать.
#[derive(Debug, Clone, Serialize)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// Поле в кавычках; внутренние кавычки удваиваются.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl StopwatchEngine {
    /// Экспорт коллекции в CSV в текущем порядке отображения.
    /// Колонка Time (formatted) использует активный режим отображения;
    /// отсутствующий shortcut рендерится как "None".
    pub fn export_csv(&self) -> Result<CsvExport, String> {
        let display_in_seconds = *self
            .display_in_seconds
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let watches = self
            .watches
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;

        let mut lines = vec!["Name,Time (ms),Time (formatted),Shortcut Key".to_string()];
        for sw in watches.iter() {
            let row = [
                quote(&sw.name),
                quote(&sw.elapsed_ms.to_string()),
                quote(&format_elapsed(sw.elapsed_ms, display_in_seconds)),
                quote(sw.shortcut_key.as_deref().unwrap_or("None")),
            ];
            lines.push(row.join(","));
        }
        let row_count = lines.len() - 1;
        drop(watches);

        let filename = format!(
            "stopwatches-{}.csv",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ")
        );
        debug!("[EXPORT] {} rows -> {}", row_count, filename);
        Ok(CsvExport {
            filename,
            content: lines.join("\n"),
        })
    }
}
