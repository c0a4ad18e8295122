use futures::StreamExt;
use tokio_stream::Stream;
use simd_json::OwnedValue;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::{
    recommendation_prompt, BoxError, Fragment, FragmentStream, Handoff, PipelineError, RandomStock,
    RecordProcessor, SessionConfig, StreamProducer, TextSource,
};

/// Where a session is in its lifecycle. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Streaming,
    Done,
}

/// Snapshot of a session as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub query: String,
    pub current: Option<OwnedValue>,
    pub done: bool,
}

/// Drives one streaming session: starts the producer once, then pulls one
/// record at a time from the hand-off channel and runs it through the
/// [`RecordProcessor`] until the end-of-stream marker arrives.
///
/// Buffer and channel belong to a single session; a failed session is retried
/// by building a new one. Dropping a session aborts its producer.
pub struct Session {
    query: String,
    phase: Phase,
    // Both taken exactly once, when the producer starts.
    source: Option<FragmentStream>,
    tx: Option<mpsc::Sender<Handoff>>,
    rx: mpsc::Receiver<Handoff>,
    producer: Option<JoinHandle<()>>,
    processor: RecordProcessor,
    current: Option<OwnedValue>,
    config: SessionConfig,
}

impl Session {
    pub fn new<S>(query: impl Into<String>, source: S, config: SessionConfig) -> Self
    where
        S: Stream<Item = Result<Fragment, BoxError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            query: query.into(),
            phase: Phase::NotStarted,
            source: Some(source.boxed()),
            tx: Some(tx),
            rx,
            producer: None,
            processor: RecordProcessor::new(RandomStock::new(config.in_stock_ratio)),
            current: None,
            config,
        }
    }

    pub fn with_processor(mut self, processor: RecordProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> PipelineState {
        PipelineState {
            query: self.query.clone(),
            current: self.current.clone(),
            done: self.phase == Phase::Done,
        }
    }

    /// Starts the background producer. Calling it again, or after the session
    /// is done, does nothing.
    pub fn start(&mut self) {
        if self.phase != Phase::NotStarted {
            return;
        }
        let (Some(source), Some(tx)) = (self.source.take(), self.tx.take()) else {
            return;
        };
        debug!("Starting producer for query {:?}", self.query);
        self.producer = Some(StreamProducer::new(&self.config).spawn(source, tx));
        self.phase = Phase::Streaming;
    }

    /// Waits for the next record and returns it processed.
    ///
    /// Returns `Ok(None)` once the stream has ended cleanly. A producer fault is
    /// returned once, after every record extracted before it; the session is
    /// done afterwards.
    #[instrument(skip(self), fields(query = %self.query))]
    pub async fn next_record(&mut self) -> Result<Option<OwnedValue>, PipelineError> {
        if self.phase == Phase::Done {
            return Ok(None);
        }
        self.start();

        let item = match self.config.item_timeout {
            Some(limit) => match timeout(limit, self.rx.recv()).await {
                Ok(item) => item,
                Err(_) => {
                    warn!("No record within {:?}, abandoning the session", limit);
                    self.finish();
                    return Err(PipelineError::Timeout);
                }
            },
            None => self.rx.recv().await,
        };

        match item {
            Some(Handoff::Record(record)) => {
                let record = self.processor.process(record);
                self.current = Some(record.clone());
                Ok(Some(record))
            }
            Some(Handoff::End(cause)) => {
                self.finish();
                match cause {
                    None => {
                        debug!("End of stream");
                        Ok(None)
                    }
                    Some(e) => Err(e),
                }
            }
            None => {
                self.finish();
                Err(PipelineError::ChannelClosed)
            }
        }
    }

    /// Turns the session into a stream of processed records. The stream ends
    /// after the end-of-stream marker or right after the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<OwnedValue, PipelineError>> + Send {
        async_stream::stream! {
            loop {
                match self.next_record().await {
                    Ok(Some(record)) => yield Ok(record),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn abort_producer(&self) {
        if let Some(producer) = &self.producer {
            producer.abort();
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        self.source = None;
        self.tx = None;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.rx.close();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            if !producer.is_finished() {
                debug!("Session dropped mid-stream, aborting producer");
                producer.abort();
            }
        }
    }
}

/// Asks `source` for recommendations matching `query` and streams the
/// processed records as they complete.
pub fn run_session(
    query: &str,
    source: &dyn TextSource,
    config: SessionConfig,
) -> impl Stream<Item = Result<OwnedValue, PipelineError>> + Send {
    let prompt = recommendation_prompt(query);
    Session::new(query, source.stream(&prompt), config).into_stream()
}
