use crate::database::Database;
use crate::engine::{default_collection, Stopwatch, Theme};
use std::sync::Arc;
use tracing::{error, warn};

/// Ключи хранилища. Формат наследуется от прежних версий приложения —
/// менять нельзя без миграции.
pub const KEY_STOPWATCHES: &str = "stopwatches";
pub const KEY_DISPLAY_IN_SECONDS: &str = "displayInSeconds";
pub const KEY_HIDE_BUTTONS: &str = "hideButtons";
pub const KEY_THEME: &str = "theme-preference";

/// Слой персистентности: снапшот коллекции + скалярные настройки поверх
/// key-value БД. Инжектируется в движок как явный collaborator.
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Загрузить последний снапшот. running у каждой записи принудительно
    /// false: перезапуск всегда даёт полностью остановленную коллекцию.
    /// GUARD: НИКОГДА не падать на ошибке восстановления — битые данные
    /// молча заменяются коллекцией по умолчанию (одна запись id=1).
    pub fn load(&self) -> Vec<Stopwatch> {
        let raw = match self.db.get_value(KEY_STOPWATCHES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default_collection(),
            Err(e) => {
                error!("[STORE] Failed to read snapshot: {}. Using default.", e);
                return default_collection();
            }
        };
        match serde_json::from_str::<Vec<Stopwatch>>(&raw) {
            Ok(mut watches) => {
                for sw in watches.iter_mut() {
                    sw.running = false;
                }
                watches
            }
            Err(e) => {
                // Восстановить нечего, но это не фатально: corrupt-but-harmless
                error!("[STORE] Malformed snapshot ({}). Using default.", e);
                default_collection()
            }
        }
    }

    /// Сохранить снапшот. running принудительно false независимо от
    /// состояния в памяти; tick-handles в сериализуемой форме отсутствуют.
    pub fn save(&self, watches: &[Stopwatch]) -> Result<(), String> {
        let snapshot: Vec<Stopwatch> = watches
            .iter()
            .map(|sw| Stopwatch {
                running: false,
                ..sw.clone()
            })
            .collect();
        let raw = serde_json::to_string(&snapshot)
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
        self.db
            .set_value(KEY_STOPWATCHES, &raw)
            .map_err(|e| format!("Failed to write snapshot: {}", e))
    }

    /// Скалярная настройка из текстовой формы ("true"/"false").
    /// Нечитаемое значение — default.
    pub fn load_bool(&self, key: &str, default: bool) -> bool {
        match self.db.get_value(key) {
            Ok(Some(raw)) => match raw.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    warn!("[STORE] Unexpected value '{}' for {}, using default", other, key);
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                error!("[STORE] Failed to read {}: {}. Using default.", key, e);
                default
            }
        }
    }

    pub fn save_bool(&self, key: &str, value: bool) -> Result<(), String> {
        self.db
            .set_value(key, if value { "true" } else { "false" })
            .map_err(|e| format!("Failed to write {}: {}", key, e))
    }

    /// Тема: "dark"|"light"; отсутствие или мусор — default от хоста
    /// (сигнал тёмной темы ОС).
    pub fn load_theme(&self, default: Theme) -> Theme {
        match self.db.get_value(KEY_THEME) {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!("[STORE] Unexpected theme '{}', using default", raw);
                default
            }),
            Ok(None) => default,
            Err(e) => {
                error!("[STORE] Failed to read theme: {}. Using default.", e);
                default
            }
        }
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), String> {
        self.db
            .set_value(KEY_THEME, theme.as_str())
            .map_err(|e| format!("Failed to write theme: {}", e))
    }
}
