use crate::engine::{EngineConfig, StopwatchEngine, Theme};
use crate::store::StateStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

impl StopwatchEngine {
    /// Инициализация с персистентностью. Снапшот загружается сразу;
    /// все записи принудительно stopped (нормализует StateStore::load).
    /// default_theme приходит от хоста (сигнал тёмной темы ОС).
    pub fn with_store(store: Arc<StateStore>, config: EngineConfig, default_theme: Theme) -> Self {
        let watches = store.load();
        let seed = watches.iter().map(|sw| sw.id).max().unwrap_or(0);
        let display_in_seconds = store.load_bool(crate::store::KEY_DISPLAY_IN_SECONDS, false);
        let hide_buttons = store.load_bool(crate::store::KEY_HIDE_BUTTONS, false);
        let theme = store.load_theme(default_theme);
        info!(
            "[RECOVERY] Restored {} stopwatch(es), display_in_seconds={}, theme={}",
            watches.len(),
            display_in_seconds,
            theme.as_str()
        );
        Self {
            watches: Arc::new(Mutex::new(watches)),
            tick_tasks: Arc::new(Mutex::new(HashMap::new())),
            pending_edits: Arc::new(Mutex::new(HashMap::new())),
            editing_shortcut: Arc::new(Mutex::new(None)),
            id_seed: Arc::new(Mutex::new(seed)),
            display_in_seconds: Arc::new(Mutex::new(display_in_seconds)),
            hide_buttons: Arc::new(Mutex::new(hide_buttons)),
            theme: Arc::new(Mutex::new(theme)),
            config,
            store: Some(store),
        }
    }

    /// Сохранить снапшот коллекции в store (running в снапшоте всегда false).
    /// Публичный метод для явного сохранения (например, при выходе хоста).
    pub fn save_state(&self) -> Result<(), String> {
        let store = match &self.store {
            Some(store) => store,
            None => return Ok(()), // Нет store — пропускаем
        };
        let snapshot = {
            let watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            watches.clone()
        }; // Lock released before IO
        store.save(&snapshot)
    }

    /// Best-effort сохранение после durable-операции: ошибка логируется,
    /// не прерывает операцию (retry-пути нет, см. политику персистентности).
    pub(crate) fn persist(&self) {
        if let Err(e) = self.save_state() {
            error!("[TIMER] Failed to save state: {}", e);
        }
    }
}
