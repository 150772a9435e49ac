use crate::engine::StopwatchEngine;
use tracing::debug;

impl StopwatchEngine {
    /// Пометить запись как ожидающую захвата следующей клавиши.
    /// Захват один на движок: новый запрос вытесняет прежний.
    pub fn start_shortcut_edit(&self, id: u64) -> Result<(), String> {
        let mut editing = self
            .editing_shortcut
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        *editing = Some(id);
        Ok(())
    }

    /// Маршрутизация глобального нажатия клавиши. Возвращает true, если
    /// событие обработано. Приоритет:
    ///   1) ожидающий захват shortcut'а (работает и из text input);
    ///   2) пробел — start-all/stop-all toggle;
    ///   3) "r" — relaunch;
    ///   4) зарегистрированный shortcut записи — toggle этой записи.
    /// Для пунктов 2-4 события из text input игнорируются.
    pub fn handle_key(&self, key: &str, from_text_input: bool) -> Result<bool, String> {
        let capture_target = {
            let mut editing = self
                .editing_shortcut
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            editing.take()
        };
        if let Some(id) = capture_target {
            let key = key.to_lowercase();
            debug!("[KEYS] Captured shortcut '{}' for stopwatch {}", key, id);
            self.set_shortcut(id, &key)?;
            return Ok(true);
        }

        if from_text_input {
            // Глобальные бинды не должны срабатывать при наборе текста
            return Ok(false);
        }

        match key {
            " " => {
                // Toggle start-all/stop-all: если хоть один бежит — стоп всем
                let any_running = {
                    let watches = self
                        .watches
                        .lock()
                        .map_err(|e| format!("Mutex poisoned: {}", e))?;
                    watches.iter().any(|sw| sw.running)
                };
                if any_running {
                    self.stop_all()?;
                } else {
                    self.start_all()?;
                }
                Ok(true)
            }
            "r" => {
                self.relaunch()?;
                Ok(true)
            }
            _ => {
                let key = key.to_lowercase();
                let target = {
                    let watches = self
                        .watches
                        .lock()
                        .map_err(|e| format!("Mutex poisoned: {}", e))?;
                    // Первое совпадение в порядке коллекции (дубликаты допустимы)
                    watches
                        .iter()
                        .find(|sw| sw.shortcut_key.as_deref() == Some(key.as_str()))
                        .map(|sw| sw.id)
                };
                match target {
                    Some(id) => {
                        self.toggle(id)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }
}
