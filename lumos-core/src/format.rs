///! User-facing message formatting (Telegram Markdown)

use chrono::{Datelike, NaiveDate};

use crate::diff::{ChangeKind, ScheduleChange};
use crate::reminder::{EventKind, PowerEvent};
use crate::schedule::{OutageSlot, DATE_FORMAT, TIME_FORMAT};
use crate::Queue;

const DAY_NAMES: [&str; 7] = [
    "Понеділок",
    "Вівторок",
    "Середа",
    "Четвер",
    "П'ятниця",
    "Субота",
    "Неділя",
];

pub fn weekday_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

fn slot_lines(slots: &[OutageSlot]) -> String {
    if slots.is_empty() {
        return "  ✅ Відключень не заплановано".to_string();
    }
    slots
        .iter()
        .map(|slot| format!("  🔴 {}", slot))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One change notification: header by change kind, the date with its
/// weekday, then the slot list.
pub fn change_notification(queue: Queue, change: &ScheduleChange) -> String {
    let header = match change.kind {
        ChangeKind::New => "🆕 *Новий графік відключень!*",
        ChangeKind::Updated => "⚡️ *Оновлення графіка відключень!*",
    };
    format!(
        "{}\n\n🔢 *Черга:* {}\n\n📅 *{}* _{}_\n{}",
        header,
        queue,
        change.date.format(DATE_FORMAT),
        weekday_name(change.date),
        slot_lines(&change.slots)
    )
}

/// Lead-time label matching the settings keyboard ("1 год", "30 хв", ...).
pub fn lead_label(minutes: u32) -> String {
    if minutes >= 60 && minutes % 60 == 0 {
        format!("{} год", minutes / 60)
    } else {
        format!("{} хв", minutes)
    }
}

/// One reminder message for an upcoming transition.
pub fn reminder_message(queue: Queue, event: &PowerEvent, lead_minutes: u32) -> String {
    let (emoji, what) = match event.kind {
        EventKind::PowerOff => ("🔴", "відключення світла"),
        EventKind::PowerOn => ("🟢", "увімкнення світла"),
    };
    format!(
        "🔔 *Нагадування!*\n\n{} Через {} очікується {} о *{}* (черга {})",
        emoji,
        lead_label(lead_minutes),
        what,
        event.at.format(TIME_FORMAT),
        queue
    )
}
