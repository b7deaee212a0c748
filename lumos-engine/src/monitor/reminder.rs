///! Reminder scheduler
///!
///! Runs once per minute, independent of the change pollers. Each tick
///! builds a throwaway cache of today's schedule for every (region,
///! queue), then walks the eligible users and fires whichever lead-time
///! windows are crossed, deduplicating through the state store. The cache
///! never outlives the tick: a minute of staleness is fine, cross-tick
///! reuse would miss same-minute updates.

use chrono::{Duration as ChronoDuration, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::monitor::MonitorConfig;
use crate::source::ScheduleSource;
use crate::store::{StateStore, SubscriberStore};
use lumos_core::format::reminder_message;
use lumos_core::reminder::{due_lead, slot_events, ReminderKey};
use lumos_core::schedule::{kyiv_now, OutageSlot};
use lumos_core::subscriber::Subscriber;
use lumos_core::{Queue, Region, UserId};

/// Reminder facts older than this are purged once per day.
const RETENTION_DAYS: i64 = 2;

/// Daily purge hour (Kyiv); fires on the first tick inside the window.
const PURGE_HOUR: u32 = 3;

type TickCache = HashMap<(Region, Queue), Vec<OutageSlot>>;

pub struct ReminderScheduler {
    sources: Vec<Arc<dyn ScheduleSource>>,
    state: Arc<dyn StateStore>,
    subscribers: Arc<dyn SubscriberStore>,
    dispatcher: Arc<dyn Dispatcher>,
    config: MonitorConfig,
}

impl ReminderScheduler {
    pub fn new(
        sources: Vec<Arc<dyn ScheduleSource>>,
        state: Arc<dyn StateStore>,
        subscribers: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn Dispatcher>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            sources,
            state,
            subscribers,
            dispatcher,
            config,
        }
    }

    pub async fn run(self) {
        info!("Reminder scheduler started");
        sleep(self.config.reminder_startup_delay).await;

        loop {
            self.tick(kyiv_now()).await;
            sleep(self.config.reminder_tick).await;
        }
    }

    /// One evaluation pass at `now` (Kyiv wall clock).
    pub async fn tick(&self, now: NaiveDateTime) {
        if now.hour() == PURGE_HOUR && now.minute() < 2 {
            self.purge_old(now).await;
        }

        let users = match self.subscribers.reminder_subscribers().await {
            Ok(users) => users,
            Err(e) => {
                warn!("Reminder subscriber lookup failed: {:#}", e);
                return;
            }
        };
        if users.is_empty() {
            return;
        }

        let cache = self.build_cache(now).await;

        for (user, subscriber) in users {
            if let Err(e) = self.process_user(now, user, &subscriber, &cache).await {
                warn!("Reminder evaluation failed for {}: {:#}", user, e);
            }
        }
    }

    /// Fetch today's slots for every (region, queue) in one pass. A
    /// failed queue is simply absent, which reads as "no data".
    async fn build_cache(&self, now: NaiveDateTime) -> TickCache {
        let today = now.date();
        let mut cache = TickCache::new();
        for source in &self.sources {
            let region = source.region();
            for queue in Queue::ALL {
                match source.fetch(queue).await {
                    Ok(snapshot) => {
                        if let Some(slots) = snapshot.day(&today) {
                            cache.insert((region, queue), slots.to_vec());
                        }
                    }
                    Err(e) => debug!("Reminder fetch {} {} failed: {:#}", region, queue, e),
                }
            }
        }
        cache
    }

    async fn process_user(
        &self,
        now: NaiveDateTime,
        user: UserId,
        subscriber: &Subscriber,
        cache: &TickCache,
    ) -> anyhow::Result<()> {
        for queue in &subscriber.queues {
            let Some(slots) = cache.get(&(subscriber.region, *queue)) else {
                continue;
            };
            for slot in slots {
                for event in slot_events(now.date(), slot) {
                    let Some(lead) = due_lead(event.at, now, &subscriber.lead_times) else {
                        continue;
                    };
                    let key = ReminderKey {
                        user,
                        queue: *queue,
                        event_at: event.at,
                        kind: event.kind,
                        lead_minutes: lead,
                    };
                    if self.state.reminder_sent(&key).await? {
                        continue;
                    }
                    let text = reminder_message(*queue, &event, lead);
                    match self.dispatcher.send(user, &text).await {
                        // The fact is recorded only after a successful
                        // send, so a failed delivery retries while the
                        // window is still open.
                        Ok(()) => self.state.mark_reminder_sent(&key, now).await?,
                        Err(e) => warn!("Reminder send error to {}: {:#}", user, e),
                    }
                }
            }
        }
        Ok(())
    }

    async fn purge_old(&self, now: NaiveDateTime) {
        let cutoff = now - ChronoDuration::days(RETENTION_DAYS);
        match self.state.purge_reminders_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => info!("Purged {} old reminder facts", removed),
            Err(e) => warn!("Reminder purge failed: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::RecordingDispatcher;
    use crate::monitor::testing::{instant_config, StaticSource};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use lumos_core::schedule::{parse_date, ScheduleSnapshot};

    fn queue(s: &str) -> Queue {
        s.parse().unwrap()
    }

    fn at(date: NaiveDate, time: &str) -> NaiveDateTime {
        date.and_time(time.parse().unwrap())
    }

    struct Fixture {
        scheduler: ReminderScheduler,
        store: Arc<MemoryStore>,
        dispatcher: Arc<RecordingDispatcher>,
        date: NaiveDate,
    }

    /// One Prykarpattia user following 1.1, outage 10:00-18:00 today.
    fn fixture(lead_times: Vec<u32>) -> Fixture {
        let date = parse_date("20.01.2026").unwrap();
        let mut snapshot = ScheduleSnapshot::new();
        snapshot.insert_day(date, vec![OutageSlot::parse("10:00", "18:00").unwrap()]);

        let store = Arc::new(MemoryStore::new());
        let mut sub = Subscriber::new(Region::Prykarpattia);
        sub.queues.insert(queue("1.1"));
        sub.lead_times = lead_times;
        store.insert_subscriber(42, sub);

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scheduler = ReminderScheduler::new(
            vec![Arc::new(StaticSource::new(Region::Prykarpattia, snapshot))],
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            instant_config(),
        );
        Fixture {
            scheduler,
            store,
            dispatcher,
            date,
        }
    }

    #[tokio::test]
    async fn fires_once_per_window_across_overlapping_ticks() {
        // Power-on event at 18:00, lead-times [60, 30].
        let f = fixture(vec![60, 30]);

        // 31 minutes out: no window crossed.
        f.scheduler.tick(at(f.date, "17:29:00")).await;
        assert!(f.dispatcher.sent_to(42).is_empty());

        // Exactly 30 minutes: fires.
        f.scheduler.tick(at(f.date, "17:30:00")).await;
        let sent = f.dispatcher.sent_to(42);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("увімкнення"));
        assert!(sent[0].contains("30 хв"));

        // Next tick still inside the window: deduplicated.
        f.scheduler.tick(at(f.date, "17:31:00")).await;
        assert_eq!(f.dispatcher.sent_to(42).len(), 1);
    }

    #[tokio::test]
    async fn power_off_and_power_on_remind_independently() {
        let f = fixture(vec![60]);

        // 09:00 → one hour before the 10:00 power-off.
        f.scheduler.tick(at(f.date, "09:00:00")).await;
        // 17:00 → one hour before the 18:00 power-on.
        f.scheduler.tick(at(f.date, "17:00:00")).await;

        let sent = f.dispatcher.sent_to(42);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("відключення"));
        assert!(sent[1].contains("увімкнення"));
    }

    #[tokio::test]
    async fn each_lead_time_fires_for_the_same_event() {
        let f = fixture(vec![60, 30]);

        f.scheduler.tick(at(f.date, "17:00:00")).await;
        f.scheduler.tick(at(f.date, "17:30:00")).await;

        let sent = f.dispatcher.sent_to(42);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("1 год"));
        assert!(sent[1].contains("30 хв"));
    }

    #[tokio::test]
    async fn failed_send_leaves_no_fact_and_retries() {
        let date = parse_date("20.01.2026").unwrap();
        let mut snapshot = ScheduleSnapshot::new();
        snapshot.insert_day(date, vec![OutageSlot::parse("10:00", "18:00").unwrap()]);

        let store = Arc::new(MemoryStore::new());
        let mut sub = Subscriber::new(Region::Prykarpattia);
        sub.queues.insert(queue("1.1"));
        store.insert_subscriber(42, sub);
        let mut healthy = Subscriber::new(Region::Prykarpattia);
        healthy.queues.insert(queue("1.1"));
        store.insert_subscriber(43, healthy);

        let dispatcher = Arc::new(RecordingDispatcher {
            failing_users: vec![42],
            ..Default::default()
        });
        let scheduler = ReminderScheduler::new(
            vec![Arc::new(StaticSource::new(Region::Prykarpattia, snapshot))],
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            instant_config(),
        );

        scheduler.tick(at(date, "17:00:00")).await;

        // The failing user's fact was not recorded, the other user's was.
        assert!(dispatcher.sent_to(42).is_empty());
        assert_eq!(dispatcher.sent_to(43).len(), 1);
        assert_eq!(store.reminder_fact_count(), 1);
    }

    #[tokio::test]
    async fn purges_old_facts_during_the_night_window() {
        let f = fixture(vec![60]);

        // Fire one reminder, then pretend three days pass.
        f.scheduler.tick(at(f.date, "17:00:00")).await;
        assert_eq!(f.store.reminder_fact_count(), 1);

        let later = f.date + chrono::Duration::days(3);
        f.scheduler.tick(at(later, "03:00:30")).await;
        assert_eq!(f.store.reminder_fact_count(), 0);

        // Outside the purge window nothing is touched.
        f.scheduler.tick(at(f.date, "17:00:00")).await;
        assert_eq!(f.store.reminder_fact_count(), 1);
        f.scheduler.tick(at(f.date, "12:00:00")).await;
        assert_eq!(f.store.reminder_fact_count(), 1);
    }

    #[tokio::test]
    async fn source_failure_skips_the_tick_quietly() {
        let date = parse_date("20.01.2026").unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut sub = Subscriber::new(Region::Prykarpattia);
        sub.queues.insert(queue("1.1"));
        store.insert_subscriber(42, sub);

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let scheduler = ReminderScheduler::new(
            vec![Arc::new(StaticSource::failing(Region::Prykarpattia))],
            store.clone(),
            store,
            dispatcher.clone(),
            instant_config(),
        );

        scheduler.tick(at(date, "17:00:00")).await;
        assert!(dispatcher.sent_to(42).is_empty());
    }
}
