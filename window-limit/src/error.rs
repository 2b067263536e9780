/// Errors produced while configuring or driving an admission controller.
///
/// Rejecting a request is not an error; see [`crate::Decision`].
#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    /// A configuration value was out of range.
    ///
    /// Values are never clamped: a zero rate, a zero resolution or a ticker
    /// interval that rounds down to nothing is refused at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// `start` was called on a ticker that is already running.
    #[error("ticker is already running")]
    AlreadyStarted,

    /// `start` was called after the ticker was deactivated.
    ///
    /// Deactivation is one-way; build a new ticker instead.
    #[error("ticker has been deactivated and cannot be restarted")]
    Deactivated,

    /// The operating system refused to spawn the ticker thread.
    #[error("failed to spawn ticker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
