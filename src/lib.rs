//! # Streaming Book Recommendations
//!
//! This library pulls book recommendations out of a text generator's answer
//! while the answer is still being written. The generator is asked for NDJSON;
//! every JSON object is extracted as soon as its closing brace arrives, handed
//! over a bounded channel to the consumer, filled in and tagged with its
//! availability, and surfaced to the caller one record at a time.
//!
//! Records arrive in stream order. A session that fails mid-stream still
//! yields every record completed before the failure, then the error, then ends.
//!
//! ## Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use bookflow::{run_session, ScriptedSource, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A canned generator answer, delivered in arbitrary pieces.
//!     let source = ScriptedSource::new([
//!         "{\"title\":\"Dune\",",
//!         "\"author\":\"Herbert\"}\n{\"title\":\"Neuromancer\"}\n",
//!     ]);
//!
//!     let records = run_session("classic science fiction", &source, SessionConfig::default());
//!     futures::pin_mut!(records);
//!     while let Some(record) = records.next().await {
//!         println!("{}", simd_json::to_string(&record?)?);
//!     }
//!     Ok(())
//! }
//! ```

#[cfg(test)]
mod tests;

mod error;
pub use error::*;

mod extract_json;
pub use extract_json::*;

mod fragment;
pub use fragment::*;

mod reader;
pub use reader::*;

mod stream_adapter;
pub use stream_adapter::*;

mod producer;
pub use producer::*;

mod processor;
pub use processor::*;

mod prompt;
pub use prompt::*;

mod session;
pub use session::*;

mod settings;
pub use settings::*;

#[cfg(feature = "http")]
pub mod connectors;

#[cfg(feature = "metrics")]
pub mod metrics;
