use std::time::Duration;

/// A single-shot deferred action handed out by a [`Scheduler`].
///
/// The handle makes no promise about racing dispatches:
/// a run may already be underway when `cancel` returns.
pub trait Deferred: Send + Sync {
    /// Schedule the action to run once after `duration`,
    /// replacing any earlier scheduled run.
    fn reset(&self, duration: Duration);

    /// Best-effort cancellation of the scheduled run.
    fn cancel(&self);
}

/// A clock-driven facility dispatching deferred actions
/// concurrently with the caller.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule_once(
        &self,
        duration: Duration,
        callback: Box<dyn Fn() + Send + Sync>,
    ) -> Box<dyn Deferred>;
}
