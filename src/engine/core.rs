use crate::engine::{Stopwatch, StopwatchEngine, TICK_MS};
use crate::models::{EngineState, StopwatchView};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Результат одного тика для записи (поиск по id, не по ссылке).
pub(crate) enum TickOutcome {
    /// Запись running — квант добавлен.
    Applied,
    /// Запись есть, но остановлена — ничего не делаем.
    Idle,
    /// Записи больше нет в коллекции — tick-задаче пора завершиться.
    Gone,
}

/// Применить один квант тика к записи с данным id.
/// Единственный код, который прибавляет время; его используют и tick-задачи,
/// и детерминированные тесты.
pub(crate) fn tick_once(watches: &mut [Stopwatch], id: u64) -> TickOutcome {
    match watches.iter_mut().find(|sw| sw.id == id) {
        Some(sw) if sw.running => {
            sw.elapsed_ms = sw.elapsed_ms.saturating_add(TICK_MS);
            TickOutcome::Applied
        }
        Some(_) => TickOutcome::Idle,
        None => TickOutcome::Gone,
    }
}

/// Чистое форматирование elapsed времени.
/// display_in_seconds=false: "HH:MM:SS.CC" (часы не ограничены, паддинг до 2 цифр).
/// display_in_seconds=true: "{секунды}.{CC}s".
/// Сантисекунды усекаются, не округляются.
pub fn format_elapsed(elapsed_ms: u64, display_in_seconds: bool) -> String {
    let centis = (elapsed_ms % 1000) / 10;
    let total_seconds = elapsed_ms / 1000;
    if display_in_seconds {
        return format!("{}.{:02}s", total_seconds, centis);
    }
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

impl StopwatchEngine {
    /// Добавить новый остановленный секундомер.
    /// id берётся из session high-water mark: после remove id не переиспользуются
    /// (сброс только при relaunch/clear_all). Мягкий лимит — политика конфига.
    pub fn add(&self) -> Result<(), String> {
        let new_id = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            if let Some(cap) = self.config.max_stopwatches {
                if watches.len() >= cap {
                    warn!("[TIMER] Stopwatch cap reached ({}), add ignored", cap);
                    return Ok(());
                }
            }
            let mut seed = self
                .id_seed
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            let current_max = watches.iter().map(|sw| sw.id).max().unwrap_or(0);
            let new_id = (*seed).max(current_max) + 1;
            *seed = new_id;
            watches.push(Stopwatch::with_id(new_id));
            new_id
        }; // Lock released before save

        debug!("[TIMER] Added stopwatch {}", new_id);
        self.persist();
        Ok(())
    }

    /// Удалить секундомер. Сначала снимается tick-задача, потом запись —
    /// иначе осиротевшая задача продолжит мутировать удалённую запись.
    /// Отсутствующий id — no-op.
    pub fn remove(&self, id: u64) -> Result<(), String> {
        self.release_tick_task(id)?;
        let removed = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            let before = watches.len();
            watches.retain(|sw| sw.id != id);
            before != watches.len()
        };
        if removed {
            debug!("[TIMER] Removed stopwatch {}", id);
            self.persist();
        }
        Ok(())
    }

    /// Переход: Stopped → Running или Running → Stopped.
    /// Единственное место, где устанавливается/снимается tick-задача.
    /// Отсутствующий id — no-op. Не персистится (как и в UI-потоке host'а):
    /// снапшот всё равно всегда stopped.
    pub fn toggle(&self, id: u64) -> Result<(), String> {
        let is_running = {
            let watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter().find(|sw| sw.id == id) {
                Some(sw) => sw.running,
                None => return Ok(()),
            }
        };

        if is_running {
            // Running → Stopped: сначала снимаем задачу, потом флаг
            self.release_tick_task(id)?;
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            if let Some(sw) = watches.iter_mut().find(|sw| sw.id == id) {
                sw.running = false;
            }
        } else {
            // Stopped → Running: задача создаётся до установки флага,
            // чтобы не остаться с running=true без задачи при ошибке spawn
            let task = self.spawn_tick_task(id)?;
            {
                let mut watches = self
                    .watches
                    .lock()
                    .map_err(|e| format!("Mutex poisoned: {}", e))?;
                match watches.iter_mut().find(|sw| sw.id == id) {
                    Some(sw) => sw.running = true,
                    None => {
                        // Запись исчезла между проверкой и стартом
                        task.abort();
                        return Ok(());
                    }
                }
            }
            let mut tasks = self
                .tick_tasks
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            if let Some(stale) = tasks.insert(id, task) {
                // GUARD: двух задач на один id быть не должно
                warn!("[TIMER] Stale tick task found for {}, aborting", id);
                stale.abort();
            }
        }
        Ok(())
    }

    /// Сброс: снять tick-задачу, обнулить время, остановить. Идентичность,
    /// имя и shortcut сохраняются. Отсутствующий id — no-op.
    pub fn reset(&self, id: u64) -> Result<(), String> {
        self.release_tick_task(id)?;
        let found = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter_mut().find(|sw| sw.id == id) {
                Some(sw) => {
                    sw.elapsed_ms = 0;
                    sw.running = false;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        Ok(())
    }

    /// Переименовать. Любой текст допустим, без валидации.
    pub fn rename(&self, id: u64, name: &str) -> Result<(), String> {
        let found = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter_mut().find(|sw| sw.id == id) {
                Some(sw) => {
                    sw.name = name.to_string();
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        Ok(())
    }

    /// Назначить shortcut. Коллизии не проверяются: последний назначивший
    /// выигрывает, прежний владелец остаётся с дублем.
    pub fn set_shortcut(&self, id: u64, key: &str) -> Result<(), String> {
        let key = key.to_lowercase();
        let found = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter_mut().find(|sw| sw.id == id) {
                Some(sw) => {
                    sw.shortcut_key = Some(key);
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        Ok(())
    }

    pub fn clear_shortcut(&self, id: u64) -> Result<(), String> {
        let found = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter_mut().find(|sw| sw.id == id) {
                Some(sw) => {
                    sw.shortcut_key = None;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        Ok(())
    }

    /// Запустить все остановленные. Идемпотентно: уже бегущие пропускаются,
    /// порядок обхода — порядок коллекции.
    pub fn start_all(&self) -> Result<(), String> {
        let stopped: Vec<u64> = {
            let watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            watches
                .iter()
                .filter(|sw| !sw.running)
                .map(|sw| sw.id)
                .collect()
        };
        for id in stopped {
            self.toggle(id)?;
        }
        Ok(())
    }

    /// Остановить все бегущие. Идемпотентно.
    pub fn stop_all(&self) -> Result<(), String> {
        let running: Vec<u64> = {
            let watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            watches
                .iter()
                .filter(|sw| sw.running)
                .map(|sw| sw.id)
                .collect()
        };
        for id in running {
            self.toggle(id)?;
        }
        Ok(())
    }

    /// Обнулить все секундомеры, сохранив id/имя/shortcut.
    pub fn reset_all(&self) -> Result<(), String> {
        self.release_all_tick_tasks()?;
        {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            for sw in watches.iter_mut() {
                sw.elapsed_ms = 0;
                sw.running = false;
            }
        }
        self.persist();
        Ok(())
    }

    /// Полная замена: снять все задачи, заменить коллекцию одним свежим
    /// секундомером id=1 и сразу запустить его. Последовательный код без
    /// suspension — наблюдателей с "нулём записей" не бывает.
    pub fn relaunch(&self) -> Result<(), String> {
        self.release_all_tick_tasks()?;
        {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *watches = vec![Stopwatch::with_id(1)];
            let mut seed = self
                .id_seed
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *seed = 1;
        }
        let mut edits = self
            .pending_edits
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        edits.clear();
        drop(edits);
        self.persist();
        self.toggle(1)
    }

    /// Опустошить коллекцию (без замены).
    pub fn clear_all(&self) -> Result<(), String> {
        self.release_all_tick_tasks()?;
        {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            watches.clear();
            let mut seed = self
                .id_seed
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *seed = 0;
        }
        let mut edits = self
            .pending_edits
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        edits.clear();
        drop(edits);
        self.persist();
        Ok(())
    }

    /// Перестановка в порядке отображения. Индексы вне диапазона — no-op.
    /// Порядок не несёт другой семантики.
    pub fn reorder(&self, from: usize, to: usize) -> Result<(), String> {
        let moved = {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            if from >= watches.len() || to >= watches.len() || from == to {
                false
            } else {
                let sw = watches.remove(from);
                watches.insert(to, sw);
                true
            }
        };
        if moved {
            self.persist();
        }
        Ok(())
    }

    /// Один детерминированный квант для записи (для тестов и внутренних нужд).
    #[cfg(test)]
    pub(crate) fn tick(&self, id: u64) -> Result<(), String> {
        let mut watches = self
            .watches
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let _ = tick_once(&mut watches, id);
        Ok(())
    }

    /// Снимок состояния для UI (аналог get_state: poll каждый кадр).
    pub fn state(&self) -> Result<EngineState, String> {
        let display_in_seconds = *self
            .display_in_seconds
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let hide_buttons = *self
            .hide_buttons
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let theme = *self
            .theme
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let editing_shortcut = *self
            .editing_shortcut
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let watches = self
            .watches
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        let stopwatches = watches
            .iter()
            .map(|sw| StopwatchView {
                id: sw.id,
                name: sw.name.clone(),
                elapsed_ms: sw.elapsed_ms,
                running: sw.running,
                shortcut_key: sw.shortcut_key.clone(),
                formatted: format_elapsed(sw.elapsed_ms, display_in_seconds),
            })
            .collect();
        Ok(EngineState {
            stopwatches,
            display_in_seconds,
            hide_buttons,
            theme,
            editing_shortcut,
        })
    }

    /// Переключить формат отображения (секунды <-> HH:MM:SS.CC) и сохранить.
    pub fn toggle_display_format(&self) -> Result<(), String> {
        let value = {
            let mut flag = self
                .display_in_seconds
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *flag = !*flag;
            *flag
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save_bool(crate::store::KEY_DISPLAY_IN_SECONDS, value) {
                error!("[TIMER] Failed to save display format: {}", e);
            }
        }
        Ok(())
    }

    pub fn toggle_hide_buttons(&self) -> Result<(), String> {
        let value = {
            let mut flag = self
                .hide_buttons
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *flag = !*flag;
            *flag
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save_bool(crate::store::KEY_HIDE_BUTTONS, value) {
                error!("[TIMER] Failed to save hide-buttons: {}", e);
            }
        }
        Ok(())
    }

    pub fn toggle_theme(&self) -> Result<(), String> {
        let value = {
            let mut theme = self
                .theme
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            *theme = theme.toggled();
            *theme
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save_theme(value) {
                error!("[TIMER] Failed to save theme: {}", e);
            }
        }
        Ok(())
    }

    /// Породить tick-задачу для записи: interval 10 мс, первый тик через
    /// период (не сразу), пропуски не навёрстываются. Задача ищет запись
    /// по id при каждом срабатывании и завершается, когда записи нет.
    fn spawn_tick_task(&self, id: u64) -> Result<JoinHandle<()>, String> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| format!("No tokio runtime for tick task: {}", e))?;
        let watches = self.watches.clone();
        Ok(handle.spawn(async move {
            let period = Duration::from_millis(TICK_MS);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut guard = match watches.lock() {
                    Ok(g) => g,
                    Err(_) => break, // Mutex poisoned — задача больше не нужна
                };
                if let TickOutcome::Gone = tick_once(&mut guard, id) {
                    break;
                }
            }
        }))
    }

    /// Снять tick-задачу записи, если есть. Abort по handle — задача не
    /// переживает запись.
    pub(crate) fn release_tick_task(&self, id: u64) -> Result<(), String> {
        let mut tasks = self
            .tick_tasks
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        if let Some(task) = tasks.remove(&id) {
            task.abort();
        }
        Ok(())
    }

    pub(crate) fn release_all_tick_tasks(&self) -> Result<(), String> {
        let mut tasks = self
            .tick_tasks
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        for (_, task) in tasks.drain() {
            task.abort();
        }
        Ok(())
    }
}
