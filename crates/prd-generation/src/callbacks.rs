//! Streaming callbacks

/// Observer of a streamed reply
///
/// All methods default to no-ops. Cancellation is never reported through
/// [`StreamCallbacks::on_error`].
pub trait StreamCallbacks: Send + Sync {
    /// A (possibly paced) slice of reply text
    fn on_token(&self, _token: &str, _is_first: bool) {}

    /// A raw backend chunk
    fn on_chunk(&self, _raw: &str, _is_first: bool) {}

    /// The full reply once the stream ends
    fn on_complete(&self, _full_text: &str) {}

    /// The stream failed
    fn on_error(&self, _message: &str) {}
}

/// Callbacks that ignore every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl StreamCallbacks for NoopCallbacks {}
