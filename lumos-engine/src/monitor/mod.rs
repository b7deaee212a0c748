///! Background loops
///!
///! One change poller per region plus the reminder scheduler, spawned as
///! independent tokio tasks. Each loop processes its own queues/users
///! strictly sequentially; the loops share nothing but the stores, whose
///! keys are region- or tuple-qualified.

pub mod poller;
pub mod reminder;

pub use poller::ChangePoller;
pub use reminder::ReminderScheduler;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::source::ScheduleSource;
use crate::store::{StateStore, SubscriberStore};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between poll cycles per region.
    pub check_interval: Duration,
    /// Pause between queues within one cycle (upstream rate limits).
    pub queue_pause: Duration,
    /// Pause between messages to the same recipient.
    pub send_pause: Duration,
    /// Delay before the first poll, letting the process finish wiring.
    pub poller_startup_delay: Duration,
    pub reminder_startup_delay: Duration,
    /// Reminder evaluation cadence.
    pub reminder_tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(45),
            queue_pause: Duration::from_secs(1),
            send_pause: Duration::from_millis(200),
            poller_startup_delay: Duration::from_secs(5),
            reminder_startup_delay: Duration::from_secs(10),
            reminder_tick: Duration::from_secs(60),
        }
    }
}

impl MonitorConfig {
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.check_interval_secs),
            queue_pause: Duration::from_secs(config.queue_pause_secs),
            send_pause: Duration::from_millis(config.send_pause_ms),
            ..Self::default()
        }
    }
}

/// Owns the long-running tasks for the lifetime of the process.
pub struct Monitor {
    config: MonitorConfig,
    sources: Vec<Arc<dyn ScheduleSource>>,
    state: Arc<dyn StateStore>,
    subscribers: Arc<dyn SubscriberStore>,
    dispatcher: Arc<dyn Dispatcher>,
    task_handles: Vec<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        sources: Vec<Arc<dyn ScheduleSource>>,
        state: Arc<dyn StateStore>,
        subscribers: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            config,
            sources,
            state,
            subscribers,
            dispatcher,
            task_handles: Vec::new(),
        }
    }

    /// Spawn one change poller per region and the reminder scheduler.
    pub fn start_all(&mut self) {
        for source in &self.sources {
            let poller = ChangePoller::new(
                source.clone(),
                self.state.clone(),
                self.subscribers.clone(),
                self.dispatcher.clone(),
                self.config.clone(),
            );
            info!(
                "Starting change poller for {} (interval: {}s)",
                source.region(),
                self.config.check_interval.as_secs()
            );
            self.task_handles.push(tokio::spawn(poller.run()));
        }

        let scheduler = ReminderScheduler::new(
            self.sources.clone(),
            self.state.clone(),
            self.subscribers.clone(),
            self.dispatcher.clone(),
            self.config.clone(),
        );
        info!("Starting reminder scheduler (tick: 60s)");
        self.task_handles.push(tokio::spawn(scheduler.run()));

        info!("Started {} background tasks", self.task_handles.len());
    }

    pub async fn shutdown(self) {
        info!("Shutting down monitor tasks...");
        for handle in self.task_handles {
            handle.abort();
        }
        info!("All monitor tasks stopped");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use lumos_core::schedule::ScheduleSnapshot;
    use lumos_core::{Queue, Region};
    use std::sync::Mutex;

    /// Serves a fixed snapshot for every queue, or fails on demand.
    pub struct StaticSource {
        pub region: Region,
        pub snapshot: Mutex<ScheduleSnapshot>,
        pub failing: bool,
    }

    impl StaticSource {
        pub fn new(region: Region, snapshot: ScheduleSnapshot) -> Self {
            Self {
                region,
                snapshot: Mutex::new(snapshot),
                failing: false,
            }
        }

        pub fn failing(region: Region) -> Self {
            Self {
                region,
                snapshot: Mutex::new(ScheduleSnapshot::new()),
                failing: true,
            }
        }

        pub fn set_snapshot(&self, snapshot: ScheduleSnapshot) {
            *self.snapshot.lock().unwrap() = snapshot;
        }
    }

    #[async_trait]
    impl super::ScheduleSource for StaticSource {
        fn region(&self) -> Region {
            self.region
        }

        async fn fetch(&self, _queue: Queue) -> Result<ScheduleSnapshot> {
            if self.failing {
                anyhow::bail!("simulated upstream failure");
            }
            Ok(self.snapshot.lock().unwrap().clone())
        }
    }

    /// Config with all pauses zeroed so tests run instantly.
    pub fn instant_config() -> MonitorConfig {
        MonitorConfig {
            check_interval: Duration::ZERO,
            queue_pause: Duration::ZERO,
            send_pause: Duration::ZERO,
            poller_startup_delay: Duration::ZERO,
            reminder_startup_delay: Duration::ZERO,
            reminder_tick: Duration::ZERO,
        }
    }
}
