use bytes::{Buf, BytesMut};
use futures::{FutureExt, Stream, StreamExt};
use simd_json::OwnedValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

#[cfg(feature = "metrics")]
use crate::metrics::{BUFFER_SIZE_GAUGE, MALFORMED_FRAMES, RECORDS_EXTRACTED};
use crate::{extract_frame, skip_noise_line, BoxError, Fragment, PipelineError, SessionConfig};

/// Item carried by the hand-off channel.
#[derive(Debug)]
pub enum Handoff {
    /// One decoded object, in stream order.
    Record(OwnedValue),
    /// End-of-stream marker. Sent exactly once and always last; carries the
    /// error that stopped the producer, if any.
    End(Option<PipelineError>),
}

/// Accumulates upstream fragments and publishes every complete object to the
/// hand-off channel as soon as it is complete.
pub struct StreamProducer {
    buffer: BytesMut,
    max_buffer_size: usize,
    skip_invalid: bool,
    skip_noise: bool,
    // This producer's share of the process-wide buffer gauge.
    #[cfg(feature = "metrics")]
    reported: i64,
}

impl StreamProducer {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.buffer_size),
            max_buffer_size: config.max_buffer_size,
            skip_invalid: config.skip_invalid,
            skip_noise: config.skip_noise,
            #[cfg(feature = "metrics")]
            reported: 0,
        }
    }

    /// Runs the producer as a background task.
    pub fn spawn<S>(self, source: S, tx: mpsc::Sender<Handoff>) -> JoinHandle<()>
    where
        S: Stream<Item = Result<Fragment, BoxError>> + Send + 'static,
    {
        tokio::spawn(self.run(source, tx))
    }

    /// Consumes `source` to the end, then sends [`Handoff::End`].
    ///
    /// The end marker is sent whatever happens upstream: normal exhaustion, an
    /// upstream error, a malformed frame or a panic inside the pump.
    #[instrument(skip_all)]
    pub async fn run<S>(mut self, source: S, tx: mpsc::Sender<Handoff>)
    where
        S: Stream<Item = Result<Fragment, BoxError>> + Send,
    {
        let outcome = AssertUnwindSafe(self.pump(source, &tx)).catch_unwind().await;
        let cause = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!("Producer stopped early: {}", e);
                Some(e)
            }
            Err(panic) => Some(PipelineError::ProducerPanicked(panic_message(panic))),
        };

        if !self.buffer.is_empty() {
            trace!("Discarding {} unconsumed byte(s) at end of stream", self.buffer.len());
        }
        #[cfg(feature = "metrics")]
        self.report_buffer_size(0);

        if tx.send(Handoff::End(cause)).await.is_err() {
            debug!("Consumer went away before the end-of-stream marker");
        }
    }

    async fn pump<S>(&mut self, source: S, tx: &mpsc::Sender<Handoff>) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Fragment, BoxError>>,
    {
        tokio::pin!(source);

        while let Some(fragment) = source.next().await {
            let fragment = fragment.map_err(PipelineError::upstream)?;
            if fragment.is_empty() {
                continue;
            }
            if let Err(e) = fragment.append_to(&mut self.buffer) {
                warn!("{}; skipping the rest of the fragment", e);
            }
            trace!("Buffer holds {} byte(s)", self.buffer.len());

            if !self.drain(tx).await? {
                debug!("Consumer went away, stopping the producer");
                return Ok(());
            }
            if self.buffer.len() > self.max_buffer_size {
                return Err(PipelineError::BufferOverflow(self.max_buffer_size));
            }
            #[cfg(feature = "metrics")]
            self.report_buffer_size(self.buffer.len() as i64);
        }

        Ok(())
    }

    // Moves the shared gauge by the change in this producer's buffer so that
    // concurrent sessions add up instead of overwriting each other.
    #[cfg(feature = "metrics")]
    fn report_buffer_size(&mut self, len: i64) {
        BUFFER_SIZE_GAUGE.add(len - self.reported);
        self.reported = len;
    }

    /// Extracts and publishes objects until the buffer holds no complete one.
    /// Returns `false` when the consumer has dropped its end of the channel.
    async fn drain(&mut self, tx: &mpsc::Sender<Handoff>) -> Result<bool, PipelineError> {
        loop {
            let buffered = self.buffer.len();
            let step = extract_frame(&self.buffer).map(|(frame, rest)| (frame, buffered - rest.len()));

            match step {
                Ok((Some(value), consumed)) => {
                    self.buffer.advance(consumed);
                    #[cfg(feature = "metrics")]
                    RECORDS_EXTRACTED.inc();
                    // Suspends while the channel is full.
                    if tx.send(Handoff::Record(value)).await.is_err() {
                        return Ok(false);
                    }
                }
                Ok((None, _)) => match skip_noise_line(&self.buffer) {
                    Some(len) if self.skip_noise => {
                        let line = String::from_utf8_lossy(&self.buffer[..len]);
                        warn!("Skipping non-JSON line: {:?}", line.trim_end());
                        self.buffer.advance(len);
                    }
                    _ => return Ok(true),
                },
                Err(PipelineError::MalformedFrame { consumed, preview, source }) if self.skip_invalid => {
                    #[cfg(feature = "metrics")]
                    MALFORMED_FRAMES.inc();
                    warn!("Skipping invalid JSON: {}. Input: {}...", source, preview);
                    self.buffer.advance(consumed);
                }
                Err(e) => {
                    #[cfg(feature = "metrics")]
                    if e.is_frame_local() {
                        MALFORMED_FRAMES.inc();
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}
