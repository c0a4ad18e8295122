use bytes::{BufMut, BytesMut};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::warn;

use crate::{BoxError, Fragment};

/// Turns a stream of raw byte chunks into text fragments.
///
/// Chunk boundaries may split multi-byte UTF-8 sequences; the incomplete tail is
/// held back until the next chunk completes it. Invalid sequences are replaced
/// with U+FFFD.
pub struct Utf8Fragments<S> {
    stream: S,
    pending: BytesMut,
    done: bool,
}

impl<S> Utf8Fragments<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: BytesMut::new(),
            done: false,
        }
    }

    // Number of leading bytes that can be decoded now: everything except an
    // incomplete sequence at the very end.
    fn decodable_len(&self) -> usize {
        let mut offset = 0;
        let mut invalid = 0;
        let len = loop {
            match std::str::from_utf8(&self.pending[offset..]) {
                Ok(text) => break offset + text.len(),
                Err(e) => match e.error_len() {
                    None => break offset + e.valid_up_to(),
                    Some(bad) => {
                        invalid += bad;
                        offset += e.valid_up_to() + bad;
                    }
                },
            }
        };
        if invalid > 0 {
            warn!("Replacing {} invalid UTF-8 byte(s) in upstream text", invalid);
        }
        len
    }
}

impl<S, B, E> Stream for Utf8Fragments<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    type Item = Result<Fragment, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.pending.put_slice(chunk.as_ref());
                    let len = this.decodable_len();
                    if len == 0 {
                        continue;
                    }
                    let bytes = this.pending.split_to(len);
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    return Poll::Ready(Some(Ok(Fragment::Text(text))));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    if this.pending.is_empty() {
                        return Poll::Ready(None);
                    }
                    let tail = this.pending.split();
                    warn!("Upstream ended inside a UTF-8 sequence ({} byte(s))", tail.len());
                    let text = String::from_utf8_lossy(&tail).into_owned();
                    return Poll::Ready(Some(Ok(Fragment::Text(text))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
