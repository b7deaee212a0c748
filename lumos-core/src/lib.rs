///! Domain model for the Lumos outage monitor
///!
///! Pure types and logic shared by the engine: the queue/region model,
///! schedule snapshots, the change-diff engine, reminder due-evaluation,
///! and user-facing message formatting. No I/O lives here.

pub mod diff;
pub mod format;
pub mod queue;
pub mod region;
pub mod reminder;
pub mod schedule;
pub mod subscriber;

pub use queue::Queue;
pub use region::Region;

/// Telegram chat id of a subscriber.
pub type UserId = i64;
