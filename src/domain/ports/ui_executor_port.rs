//! Port definition for the UI-safe execution context.

/// Unit of work to run on the UI-safe context.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Port for marshalling deliveries onto the context that owns presentation
/// state.
///
/// Jobs submitted from one thread run in submission order.
pub trait UiExecutor: Send + Sync {
    /// Schedules `job` on the UI-safe context.
    fn execute(&self, job: UiJob);
}
