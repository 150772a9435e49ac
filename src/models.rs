use crate::engine::Theme;
use serde::Serialize;

/// Представление записи для UI: модель + отформатированное время.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopwatchView {
    pub id: u64,
    pub name: String,
    pub elapsed_ms: u64,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortcut_key: Option<String>,
    pub formatted: String,
}

/// Полный снимок состояния движка (UI опрашивает его каждый кадр).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub stopwatches: Vec<StopwatchView>,
    pub display_in_seconds: bool,
    pub hide_buttons: bool,
    pub theme: Theme,
    /// id записи, ожидающей захвата клавиши как shortcut (если есть).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing_shortcut: Option<u64>,
}
