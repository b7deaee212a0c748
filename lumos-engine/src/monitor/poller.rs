///! Change poller
///!
///! One instance per region. Every cycle it walks the queue catalog:
///! fetch → evict past dates → diff → notify subscribers → persist. A
///! failing queue is skipped for the cycle; state is persisted after the
///! fan-out attempt, so a crash in between re-notifies rather than loses.

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::monitor::MonitorConfig;
use crate::source::ScheduleSource;
use crate::store::{StateStore, SubscriberStore};
use lumos_core::diff::{diff, evict_stale, ScheduleChange};
use lumos_core::format::change_notification;
use lumos_core::schedule::kyiv_today;
use lumos_core::{Queue, Region, UserId};

pub struct ChangePoller {
    source: Arc<dyn ScheduleSource>,
    state: Arc<dyn StateStore>,
    subscribers: Arc<dyn SubscriberStore>,
    dispatcher: Arc<dyn Dispatcher>,
    config: MonitorConfig,
}

impl ChangePoller {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        state: Arc<dyn StateStore>,
        subscribers: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn Dispatcher>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            state,
            subscribers,
            dispatcher,
            config,
        }
    }

    fn region(&self) -> Region {
        self.source.region()
    }

    pub async fn run(self) {
        info!("Change poller for {} started", self.region());
        sleep(self.config.poller_startup_delay).await;

        loop {
            self.run_cycle().await;
            sleep(self.config.check_interval).await;
        }
    }

    /// One pass over the queue catalog. Failures never cross queues.
    pub async fn run_cycle(&self) {
        for queue in Queue::ALL {
            if let Err(e) = self.poll_queue(queue).await {
                warn!(
                    "Skipping {} {} this cycle: {:#}",
                    self.region(),
                    queue,
                    e
                );
            }
            sleep(self.config.queue_pause).await;
        }
    }

    async fn poll_queue(&self, queue: Queue) -> anyhow::Result<()> {
        let region = self.region();
        let today = kyiv_today();
        let mut snapshot = self.source.fetch(queue).await?;
        snapshot.retain_from(today);

        let mut previous = self.state.load_hashes(region, queue).await?;
        let evicted = evict_stale(&mut previous, today);

        let result = diff(&previous, &snapshot);

        if !result.changes.is_empty() {
            info!(
                "{} {}: {} changed date(s)",
                region,
                queue,
                result.changes.len()
            );
            self.notify_subscribers(queue, &result.changes).await;
        }

        if !result.changes.is_empty() || evicted > 0 {
            // Persist only after the fan-out attempt. A write failure
            // re-detects the same change next cycle.
            if let Err(e) = self.state.save_hashes(region, queue, &result.next_state).await {
                warn!("State write failed for {} {}: {:#}", region, queue, e);
            }
        }

        Ok(())
    }

    async fn notify_subscribers(&self, queue: Queue, changes: &[ScheduleChange]) {
        let region = self.region();
        let users = match self.subscribers.subscribers_of(region, queue).await {
            Ok(users) => users,
            Err(e) => {
                warn!("Subscriber lookup failed for {} {}: {:#}", region, queue, e);
                return;
            }
        };
        if users.is_empty() {
            return;
        }

        for user in users {
            self.send_batch(user, queue, changes).await;
        }
    }

    /// One message per changed date, oldest first; the donate marker goes
    /// on the last message only. Recipient failures never abort the batch.
    async fn send_batch(&self, user: UserId, queue: Queue, changes: &[ScheduleChange]) {
        for (i, change) in changes.iter().enumerate() {
            let text = change_notification(queue, change);
            let result = if i + 1 == changes.len() {
                self.dispatcher.send_closing(user, &text).await
            } else {
                self.dispatcher.send(user, &text).await
            };
            if let Err(e) = result {
                warn!("Send error to {}: {:#}", user, e);
            }
            sleep(self.config.send_pause).await;
        }
    }
}
