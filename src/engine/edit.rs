use crate::engine::StopwatchEngine;
use tracing::warn;

/// Парсинг числового сегмента: мусор и пустота считаются нулём,
/// редактирование никогда не отклоняется целиком.
fn parse_segment(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

/// Дробная часть -> сантисекунды: берём до двух цифр, одну цифру
/// дополняем справа нулём ("5" -> 50). Мусор -> 0.
fn parse_centis(raw: &str) -> u64 {
    let digits: String = raw.trim().chars().take(2).collect();
    if digits.is_empty() {
        return 0;
    }
    let value = match digits.parse::<u64>() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    if digits.len() == 1 {
        value * 10
    } else {
        value
    }
}

/// Компоненты -> миллисекунды с clamping: часы 0-99, минуты/секунды 0-59,
/// сантисекунды 0-99. Clamp до пересчёта.
fn components_to_ms(hours: u64, minutes: u64, seconds: u64, centis: u64) -> u64 {
    let hours = hours.min(99);
    let minutes = minutes.min(59);
    let seconds = seconds.min(59);
    let centis = centis.min(99);
    (hours * 3600 + minutes * 60 + seconds) * 1000 + centis * 10
}

impl StopwatchEngine {
    /// Начать редактирование времени. Разрешено только для остановленной
    /// записи; повторный вызов на уже редактируемом id финализирует
    /// редактирование (toggle-подобный affordance). Отсутствующий id — no-op.
    pub fn begin_time_edit(&self, id: u64) -> Result<(), String> {
        let already_editing = {
            let edits = self
                .pending_edits
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            edits.contains_key(&id)
        };
        if already_editing {
            return self.commit_time_edit(id);
        }

        let elapsed = {
            let watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            match watches.iter().find(|sw| sw.id == id) {
                Some(sw) if sw.running => {
                    // Недопустимый переход: редактирование на бегущем секундомере
                    warn!("[TIMER] Invalid transition: time edit while running (id {})", id);
                    return Err("Cannot edit time while stopwatch is running".to_string());
                }
                Some(sw) => sw.elapsed_ms,
                None => return Ok(()),
            }
        };

        let mut edits = self
            .pending_edits
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        edits.insert(id, elapsed);
        Ok(())
    }

    /// Установить время из компонентов. Clamp каждого поля до пересчёта.
    /// Не персистится — это делает commit_time_edit.
    pub fn set_time_from_components(
        &self,
        id: u64,
        hours: u64,
        minutes: u64,
        seconds: u64,
        centiseconds: u64,
    ) -> Result<(), String> {
        self.set_elapsed(id, components_to_ms(hours, minutes, seconds, centiseconds))
    }

    /// Установить время из текста. Форма выбирается активным режимом
    /// отображения: секунды-с-дробью ("3723.45") либо "HH:MM:SS.CC"
    /// (недостающие ведущие нули и сегменты допустимы: "1:2:3.5").
    /// Мусорные сегменты парсятся как ноль.
    pub fn set_time_from_text(&self, id: u64, text: &str) -> Result<(), String> {
        let display_in_seconds = *self
            .display_in_seconds
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;

        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        let centis = parse_centis(frac);

        let elapsed_ms = if display_in_seconds {
            // Режим секунд: всё слева от точки — целые секунды
            parse_segment(whole) * 1000 + centis * 10
        } else {
            // Режим HH:MM:SS: сегменты выравниваются вправо (секунды последние)
            let segments: Vec<&str> = whole.split(':').collect();
            let (hours, minutes, seconds) = match segments.as_slice() {
                [s] => (0, 0, parse_segment(s)),
                [m, s] => (0, parse_segment(m), parse_segment(s)),
                [h, m, s, ..] => (parse_segment(h), parse_segment(m), parse_segment(s)),
                [] => (0, 0, 0),
            };
            components_to_ms(hours, minutes, seconds, centis)
        };

        self.set_elapsed(id, elapsed_ms)
    }

    /// Завершить редактирование: rollback отбрасывается, снапшот персистится.
    pub fn commit_time_edit(&self, id: u64) -> Result<(), String> {
        let was_editing = {
            let mut edits = self
                .pending_edits
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            edits.remove(&id).is_some()
        };
        if was_editing {
            self.persist();
        }
        Ok(())
    }

    /// Отменить редактирование: точное до-редакционное значение
    /// восстанавливается из side-таблицы, ничего не персистится.
    pub fn cancel_time_edit(&self, id: u64) -> Result<(), String> {
        let rollback = {
            let mut edits = self
                .pending_edits
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            edits.remove(&id)
        };
        if let Some(previous) = rollback {
            let mut watches = self
                .watches
                .lock()
                .map_err(|e| format!("Mutex poisoned: {}", e))?;
            if let Some(sw) = watches.iter_mut().find(|sw| sw.id == id) {
                sw.elapsed_ms = previous;
            }
        }
        Ok(())
    }

    fn set_elapsed(&self, id: u64, elapsed_ms: u64) -> Result<(), String> {
        let mut watches = self
            .watches
            .lock()
            .map_err(|e| format!("Mutex poisoned: {}", e))?;
        if let Some(sw) = watches.iter_mut().find(|sw| sw.id == id) {
            sw.elapsed_ms = elapsed_ms;
        }
        Ok(())
    }
}
