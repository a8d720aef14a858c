//! solvelog-reminder: timezone-aware daily reminder engine.
//!
//! Three pieces: a pure matcher deciding whether an instant falls in a
//! user's configured reminder minute, an activity checker over the trailing
//! 24-hour window, and the polling scheduler that ties them to a `Notifier`.

pub mod checker;
pub mod matcher;
pub mod scheduler;

pub use checker::{ACTIVITY_WINDOW_HOURS, ActivityChecker};
pub use matcher::ReminderConfigError;
pub use scheduler::{DEFAULT_TICK_PERIOD, ReminderScheduler};

/// Delivery seam for reminders.
///
/// The scheduler only ever talks to this trait; the Discord implementation
/// lives in the channel crate. Failures are reported, logged by the caller,
/// and never retried.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_direct_message(&self, user_id: i64, text: &str) -> anyhow::Result<()>;
}
