use crate::engine::StopwatchEngine;
use crate::export::CsvExport;
use serde::{Deserialize, Serialize};

/// Команды, которые выдаёт хост-UI. Тег сериализации совпадает с именами
/// команд на стороне UI, так что хост может слать их как JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    Add,
    Remove { id: u64 },
    Toggle { id: u64 },
    Reset { id: u64 },
    Rename { id: u64, name: String },
    StartShortcutEdit { id: u64 },
    ClearShortcut { id: u64 },
    StartAll,
    StopAll,
    ResetAll,
    Relaunch,
    ClearAll,
    ExportCsv,
    ToggleDisplayFormat,
    ToggleHideButtons,
    ToggleTheme,
    BeginTimeEdit { id: u64 },
    SetTimeComponents {
        id: u64,
        hours: u64,
        minutes: u64,
        seconds: u64,
        centiseconds: u64,
    },
    SetTimeText { id: u64, text: String },
    CommitTimeEdit { id: u64 },
    CancelTimeEdit { id: u64 },
    Reorder { from: usize, to: usize },
    /// Глобальное нажатие клавиши (см. StopwatchEngine::handle_key).
    KeyPress { key: String, from_text_input: bool },
}

/// Результат команды: большинство команд ничего не возвращают.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case", tag = "result")]
pub enum CommandOutput {
    Done,
    Csv(CsvExport),
    /// true, если нажатие клавиши было обработано движком.
    KeyConsumed { consumed: bool },
}

/// Единая точка диспетчеризации команд хоста в движок.
pub fn apply(engine: &StopwatchEngine, command: Command) -> Result<CommandOutput, String> {
    match command {
        Command::Add => engine.add()?,
        Command::Remove { id } => engine.remove(id)?,
        Command::Toggle { id } => engine.toggle(id)?,
        Command::Reset { id } => engine.reset(id)?,
        Command::Rename { id, name } => engine.rename(id, &name)?,
        Command::StartShortcutEdit { id } => engine.start_shortcut_edit(id)?,
        Command::ClearShortcut { id } => engine.clear_shortcut(id)?,
        Command::StartAll => engine.start_all()?,
        Command::StopAll => engine.stop_all()?,
        Command::ResetAll => engine.reset_all()?,
        Command::Relaunch => engine.relaunch()?,
        Command::ClearAll => engine.clear_all()?,
        Command::ExportCsv => return Ok(CommandOutput::Csv(engine.export_csv()?)),
        Command::ToggleDisplayFormat => engine.toggle_display_format()?,
        Command::ToggleHideButtons => engine.toggle_hide_buttons()?,
        Command::ToggleTheme => engine.toggle_theme()?,
        Command::BeginTimeEdit { id } => engine.begin_time_edit(id)?,
        Command::SetTimeComponents {
            id,
            hours,
            minutes,
            seconds,
            centiseconds,
        } => engine.set_time_from_components(id, hours, minutes, seconds, centiseconds)?,
        Command::SetTimeText { id, text } => engine.set_time_from_text(id, &text)?,
        Command::CommitTimeEdit { id } => engine.commit_time_edit(id)?,
        Command::CancelTimeEdit { id } => engine.cancel_time_edit(id)?,
        Command::Reorder { from, to } => engine.reorder(from, to)?,
        Command::KeyPress {
            key,
            from_text_input,
        } => {
            let consumed = engine.handle_key(&key, from_text_input)?;
            return Ok(CommandOutput::KeyConsumed { consumed });
        }
    }
    Ok(CommandOutput::Done)
}
