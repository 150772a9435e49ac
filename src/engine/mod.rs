use crate::store::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

mod core;
mod db;
mod edit;
mod input;

pub use self::core::format_elapsed;

/// Квант тика: каждая tick-задача прибавляет ровно 10 мс за срабатывание.
/// Счёт квантами (не wall-clock delta) сохранён намеренно — совместимость
/// с ранее записанными выводами. Пропущенные тики теряются (Skip).
pub(crate) const TICK_MS: u64 = 10;

/// Один секундомер. Сериализуемая форма фиксирована: handle tick-задачи
/// живёт в side-таблице движка, НЕ в записи (см. StopwatchEngine::tick_tasks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stopwatch {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub elapsed_ms: u64,
    /// true ⇔ для записи существует активная tick-задача.
    /// В снапшотах всегда false (см. StateStore::save).
    #[serde(default)]
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_key: Option<String>,
}

impl Stopwatch {
    pub(crate) fn with_id(id: u64) -> Self {
        Self {
            id,
            name: format!("Stopwatch {}", id),
            elapsed_ms: 0,
            running: false,
            shortcut_key: None,
        }
    }
}

/// Коллекция по умолчанию: один остановленный секундомер с id=1.
pub(crate) fn default_collection() -> Vec<Stopwatch> {
    vec![Stopwatch::with_id(1)]
}

/// Тема оформления (персистентная настройка отображения).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Theme> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub(crate) fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Конфигурация движка.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Мягкий лимит количества секундомеров. None = без лимита.
    /// Это политика хоста, не инвариант движка.
    pub max_stopwatches: Option<usize>,
}

/// Stopwatch Engine — владеет коллекцией секундомеров и всеми переходами.
/// Все операции атомарны через mutex коллекции; tick-задачи находят запись
/// по id при каждом срабатывании (никаких захваченных ссылок на запись).
pub struct StopwatchEngine {
    /// Коллекция в порядке отображения — единственный источник истины.
    pub(crate) watches: Arc<Mutex<Vec<Stopwatch>>>,
    /// id -> активная tick-задача. Инвариант: ключ присутствует ⇔ running == true.
    pub(crate) tick_tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
    /// id -> elapsed_ms до начала редактирования (rollback для cancel_time_edit).
    /// Side-таблица: rollback живёт рядом с моделью, не внутри неё.
    pub(crate) pending_edits: Arc<Mutex<HashMap<u64, u64>>>,
    /// id секундомера, ожидающего захвата следующей клавиши как shortcut.
    pub(crate) editing_shortcut: Arc<Mutex<Option<u64>>>,
    /// Верхняя граница выданных id за сессию: после remove id не переиспользуются.
    /// Сбрасывается только при полной замене коллекции (relaunch/clear_all).
    pub(crate) id_seed: Arc<Mutex<u64>>,
    pub(crate) display_in_seconds: Arc<Mutex<bool>>,
    pub(crate) hide_buttons: Arc<Mutex<bool>>,
    pub(crate) theme: Arc<Mutex<Theme>>,
    pub(crate) config: EngineConfig,
    /// Персистентность опциональна — движок тестируется без реального backend.
    pub(crate) store: Option<Arc<StateStore>>,
}

impl StopwatchEngine {
    /// Создать движок без персистентности (для тестов или fallback).
    pub fn new(config: EngineConfig) -> Self {
        let watches = default_collection();
        let seed = watches.iter().map(|sw| sw.id).max().unwrap_or(0);
        Self {
            watches: Arc::new(Mutex::new(watches)),
            tick_tasks: Arc::new(Mutex::new(HashMap::new())),
            pending_edits: Arc::new(Mutex::new(HashMap::new())),
            editing_shortcut: Arc::new(Mutex::new(None)),
            id_seed: Arc::new(Mutex::new(seed)),
            display_in_seconds: Arc::new(Mutex::new(false)),
            hide_buttons: Arc::new(Mutex::new(false)),
            theme: Arc::new(Mutex::new(Theme::Light)),
            config,
            store: None,
        }
    }
}
