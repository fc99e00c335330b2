pub mod follow_up;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

/// Synchronous caller-side hook run after a submission outcome is known.
pub type Callback = Box<dyn Fn() + Send + Sync>;
