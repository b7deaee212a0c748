///! Schedule change detection
///!
///! Compares a fresh snapshot against the per-date hashes persisted from
///! the previous poll. Hashing goes through one canonical encoding so that
///! semantically identical slot lists always hash identically no matter
///! how the source ordered its fields.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::schedule::{OutageSlot, ScheduleSnapshot, TIME_FORMAT};

/// How a date's schedule differs from the previously observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The date was not present in the previous state.
    New,
    /// The date was present with a different slot list.
    Updated,
}

/// One changed date, carrying the slots to show the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleChange {
    pub date: NaiveDate,
    pub slots: Vec<OutageSlot>,
    pub kind: ChangeKind,
}

/// Result of one diff pass.
#[derive(Debug, Clone)]
pub struct ScheduleDiff {
    /// Changed dates, oldest first. Unchanged dates are not reported.
    pub changes: Vec<ScheduleChange>,
    /// The state to persist once notification fan-out has been attempted.
    pub next_state: BTreeMap<NaiveDate, String>,
}

/// Canonical encoding of a slot list, consumed only by the hash function.
///
/// Slots are sorted by (start, end) and rendered "HH:MM-HH:MM" joined with
/// ";". The empty list encodes to the empty string, so "no outage" hashes
/// to a stable value distinct from any non-empty schedule.
fn canonical_encoding(slots: &[OutageSlot]) -> String {
    let mut sorted: Vec<&OutageSlot> = slots.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .map(|slot| {
            format!(
                "{}-{}",
                slot.start.format(TIME_FORMAT),
                slot.end.format(TIME_FORMAT)
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Deterministic content hash of a slot list.
pub fn slots_hash(slots: &[OutageSlot]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_encoding(slots).as_bytes());
    hex::encode(hasher.finalize())
}

/// Classify every date of `current` against the stored hashes.
///
/// Pure and side-effect free. Dates present only in `previous` are carried
/// into `next_state` untouched: the sources are treated as append-only per
/// date, and past dates are pruned by [`evict_stale`] before diffing,
/// never here.
pub fn diff(
    previous: &BTreeMap<NaiveDate, String>,
    current: &ScheduleSnapshot,
) -> ScheduleDiff {
    let mut next_state = previous.clone();
    let mut changes = Vec::new();

    // Snapshot iteration is date-ordered, so changes come out oldest first.
    for (date, slots) in current.iter() {
        let hash = slots_hash(slots);
        match previous.get(date) {
            None => changes.push(ScheduleChange {
                date: *date,
                slots: slots.clone(),
                kind: ChangeKind::New,
            }),
            Some(stored) if *stored != hash => changes.push(ScheduleChange {
                date: *date,
                slots: slots.clone(),
                kind: ChangeKind::Updated,
            }),
            Some(_) => {}
        }
        next_state.insert(*date, hash);
    }

    ScheduleDiff {
        changes,
        next_state,
    }
}

/// Drop state for dates strictly before `today`. Returns how many entries
/// were removed. Runs at the start of every poll cycle so a past date can
/// never resurrect stale state.
pub fn evict_stale(hashes: &mut BTreeMap<NaiveDate, String>, today: NaiveDate) -> usize {
    let before = hashes.len();
    hashes.retain(|date, _| *date >= today);
    before - hashes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_date;

    fn slot(start: &str, end: &str) -> OutageSlot {
        OutageSlot::parse(start, end).unwrap()
    }

    fn snapshot(days: &[(&str, Vec<OutageSlot>)]) -> ScheduleSnapshot {
        let mut snap = ScheduleSnapshot::new();
        for (date, slots) in days {
            snap.insert_day(parse_date(date).unwrap(), slots.clone());
        }
        snap
    }

    #[test]
    fn hash_ignores_input_ordering() {
        let a = [slot("10:00", "14:00"), slot("18:00", "20:00")];
        let b = [slot("18:00", "20:00"), slot("10:00", "14:00")];
        assert_eq!(slots_hash(&a), slots_hash(&b));
    }

    #[test]
    fn hash_distinguishes_different_slot_lists() {
        let a = [slot("10:00", "14:00")];
        let b = [slot("10:00", "14:30")];
        assert_ne!(slots_hash(&a), slots_hash(&b));
        assert_ne!(slots_hash(&a), slots_hash(&[]));
    }

    #[test]
    fn empty_day_is_a_new_change() {
        // Nothing stored yet, source now offers a "no outage" day.
        let previous = BTreeMap::new();
        let current = snapshot(&[("20.01.2026", vec![])]);

        let result = diff(&previous, &current);

        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::New);
        assert!(result.changes[0].slots.is_empty());
        assert_eq!(
            result.next_state.get(&parse_date("20.01.2026").unwrap()),
            Some(&slots_hash(&[]))
        );
    }

    #[test]
    fn identical_day_reports_nothing() {
        let slots = vec![slot("10:00", "14:00")];
        let date = parse_date("20.01.2026").unwrap();
        let previous = BTreeMap::from([(date, slots_hash(&slots))]);
        let current = snapshot(&[("20.01.2026", slots)]);

        let result = diff(&previous, &current);

        assert!(result.changes.is_empty());
        assert_eq!(result.next_state, previous);
    }

    #[test]
    fn grown_slot_list_is_an_update() {
        let date = parse_date("20.01.2026").unwrap();
        let previous = BTreeMap::from([(date, slots_hash(&[slot("10:00", "14:00")]))]);
        let current = snapshot(&[(
            "20.01.2026",
            vec![slot("10:00", "14:00"), slot("18:00", "20:00")],
        )]);

        let result = diff(&previous, &current);

        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].kind, ChangeKind::Updated);
        assert_eq!(result.changes[0].slots.len(), 2);
    }

    #[test]
    fn diff_is_idempotent() {
        let previous = BTreeMap::new();
        let current = snapshot(&[
            ("20.01.2026", vec![slot("10:00", "14:00")]),
            ("21.01.2026", vec![]),
        ]);

        let first = diff(&previous, &current);
        assert_eq!(first.changes.len(), 2);

        let second = diff(&first.next_state, &current);
        assert!(second.changes.is_empty());
        assert_eq!(second.next_state, first.next_state);
    }

    #[test]
    fn changes_come_out_oldest_first() {
        let previous = BTreeMap::new();
        let current = snapshot(&[
            ("22.01.2026", vec![]),
            ("20.01.2026", vec![]),
            ("21.01.2026", vec![]),
        ]);

        let result = diff(&previous, &current);
        let dates: Vec<_> = result.changes.iter().map(|c| c.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn dates_missing_from_current_are_not_reported() {
        let date = parse_date("20.01.2026").unwrap();
        let previous = BTreeMap::from([(date, slots_hash(&[slot("10:00", "14:00")]))]);
        let current = ScheduleSnapshot::new();

        let result = diff(&previous, &current);

        assert!(result.changes.is_empty());
        // The entry is carried forward; only eviction removes dates.
        assert!(result.next_state.contains_key(&date));
    }

    #[test]
    fn eviction_removes_only_past_dates() {
        let today = parse_date("21.01.2026").unwrap();
        let mut hashes = BTreeMap::from([
            (parse_date("19.01.2026").unwrap(), "a".to_string()),
            (parse_date("20.01.2026").unwrap(), "b".to_string()),
            (parse_date("21.01.2026").unwrap(), "c".to_string()),
            (parse_date("22.01.2026").unwrap(), "d".to_string()),
        ]);

        let evicted = evict_stale(&mut hashes, today);

        assert_eq!(evicted, 2);
        assert_eq!(hashes.len(), 2);
        assert!(hashes.contains_key(&today));
    }
}
