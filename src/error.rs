use simd_json::Error as SimdJsonError;

/// Boxed error type produced by upstream text sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A brace-balanced span was found but it does not decode as JSON.
    /// `consumed` is the number of buffer bytes the span (plus its line ending) covers.
    #[error("Malformed frame: {source}. Input: {preview}...")]
    MalformedFrame {
        consumed: usize,
        preview: String,
        source: SimdJsonError,
    },
    #[error("Upstream fault: {0}")]
    Upstream(#[source] BoxError),
    #[error("Unexpected sub-piece type: {0}")]
    UnexpectedSubPiece(String),
    #[error("Hand-off channel closed before the end-of-stream marker")]
    ChannelClosed,
    #[error("Timeout while waiting for the next record")]
    Timeout,
    #[error("Buffer exceeded the maximum size of {0} bytes")]
    BufferOverflow(usize),
    #[error("Producer task panicked: {0}")]
    ProducerPanicked(String),
}

impl PipelineError {
    pub(crate) fn upstream<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Upstream(err.into())
    }

    /// True for errors that are local to one frame and leave the buffer usable.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, Self::MalformedFrame { .. })
    }
}
