use tokio_stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::{BoxError, Fragment, FragmentStream, TextSource};

/// Fragment stream fed through a Tokio mpsc channel.
/// Useful to simulate text arriving gradually from a generator.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Fragment, BoxError>>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<Result<Fragment, BoxError>>) -> Self {
        Self { rx }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<Fragment, BoxError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl Stream for ChannelSource {
    type Item = Result<Fragment, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // A closed channel ends the stream.
        self.rx.poll_recv(cx)
    }
}

/// Text source that replays a fixed list of fragments for every prompt,
/// optionally failing once the list is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    fragments: Vec<Fragment>,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new<I, F>(fragments: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Raise an upstream error after the last fragment.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Wait this long before every fragment.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl TextSource for ScriptedSource {
    fn stream(&self, _prompt: &str) -> FragmentStream {
        let fragments = self.fragments.clone();
        let fail_with = self.fail_with.clone();
        let delay = self.delay;

        Box::pin(async_stream::stream! {
            for fragment in fragments {
                if let Some(delay) = delay {
                    sleep(delay).await;
                }
                yield Ok(fragment);
            }
            if let Some(message) = fail_with {
                yield Err(BoxError::from(message));
            }
        })
    }
}
