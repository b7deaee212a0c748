///! Reminder due-evaluation
///!
///! Each outage slot yields two transitions: power-off at `start` and
///! power-on at `end` (with 00:00 meaning the following midnight). A
///! reminder for lead-time L is due when the event is L minutes away,
///! with one minute of grace for a late scheduler tick. The first due
///! lead-time wins for a given event within one tick.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::schedule::OutageSlot;
use crate::{Queue, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PowerOff,
    PowerOn,
}

impl EventKind {
    /// Stable identifier used in dedup keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PowerOff => "off",
            EventKind::PowerOn => "on",
        }
    }
}

/// One upcoming power transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerEvent {
    pub kind: EventKind,
    pub at: NaiveDateTime,
}

/// Both transitions of a slot on the given date. A slot ending at 00:00
/// produces a power-on event at midnight of the next day.
pub fn slot_events(date: NaiveDate, slot: &OutageSlot) -> [PowerEvent; 2] {
    let on_at = if slot.end == NaiveTime::MIN {
        date.succ_opt().unwrap_or(date).and_time(NaiveTime::MIN)
    } else {
        date.and_time(slot.end)
    };
    [
        PowerEvent {
            kind: EventKind::PowerOff,
            at: date.and_time(slot.start),
        },
        PowerEvent {
            kind: EventKind::PowerOn,
            at: on_at,
        },
    ]
}

/// Pick the lead-time that is due for an event, if any.
///
/// `lead_times` is checked in the user's configured order and the first
/// hit wins, so close-together lead-times cannot both fire in one tick.
/// A lead-time L is due when the event is between L-1 and L whole minutes
/// away: the grace minute covers a tick that lands late, and an event
/// already closer than the next-smaller threshold is left to that
/// threshold instead of firing early.
pub fn due_lead(event_at: NaiveDateTime, now: NaiveDateTime, lead_times: &[u32]) -> Option<u32> {
    let minutes_away = (event_at - now).num_minutes();
    if minutes_away < 0 {
        return None;
    }
    lead_times
        .iter()
        .copied()
        .find(|&lead| {
            let lead = i64::from(lead);
            lead - 1 <= minutes_away && minutes_away <= lead
        })
}

/// The tuple uniquely identifying one reminder opportunity. Existence of
/// a matching fact in the store means "already notified".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub user: UserId,
    pub queue: Queue,
    pub event_at: NaiveDateTime,
    pub kind: EventKind,
    pub lead_minutes: u32,
}

impl ReminderKey {
    /// Flat string form used as the persistence key.
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.user,
            self.queue,
            self.event_at.format("%d.%m.%Y %H:%M"),
            self.kind.as_str(),
            self.lead_minutes
        )
    }
}
