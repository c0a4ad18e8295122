use bytes::{BufMut, BytesMut};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::{BoxError, PipelineError};

/// One piece of incrementally delivered text from the upstream source.
///
/// Text generators deliver either plain strings or a list of typed content
/// pieces; only pieces of type `"text"` carry record text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Text(String),
    Pieces(Vec<ContentPiece>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentPiece {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

impl ContentPiece {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: text.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

impl Fragment {
    /// Appends the fragment's text to `buffer`.
    ///
    /// Pieces are appended in order until a non-text piece is met; the rest of
    /// the fragment is dropped and the offending type is returned as
    /// [`PipelineError::UnexpectedSubPiece`]. Text appended before that point stays.
    pub fn append_to(&self, buffer: &mut BytesMut) -> Result<(), PipelineError> {
        match self {
            Fragment::Text(text) => buffer.put_slice(text.as_bytes()),
            Fragment::Pieces(pieces) => {
                for piece in pieces {
                    if !piece.is_text() {
                        return Err(PipelineError::UnexpectedSubPiece(piece.kind.clone()));
                    }
                    buffer.put_slice(piece.text.as_bytes());
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Text(text) => text.is_empty(),
            Fragment::Pieces(pieces) => pieces.is_empty(),
        }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_owned())
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}

/// Asynchronous sequence of fragments as produced by a text source.
pub type FragmentStream = BoxStream<'static, Result<Fragment, BoxError>>;

/// A remote text generator that answers a prompt with a stream of fragments.
pub trait TextSource: Send + Sync {
    fn stream(&self, prompt: &str) -> FragmentStream;
}
