//! # Meridian Stream
//!
//! Cancellation-safe wrappers around long-lived asynchronous sequences.
//!
//! Results that arrive incrementally (deferred payloads, streamed lists,
//! subscription events) are modelled as a [`Sequence`]: a cheap-clone handle
//! with two independent operations, [`next`](Sequence::next) and
//! [`close`](Sequence::close). Both take `&self`, so a consumer may close a
//! sequence from one task while another task is still waiting on `next`.
//!
//! # Adapters
//!
//! | Adapter | Effect |
//! |---------|--------|
//! | [`Sequence::map_items`] | Threads every item through an async function |
//! | [`Sequence::on_complete`] | Runs callbacks exactly once when the sequence ends or is closed |
//! | [`Sequence::rewrite_errors`] | Folds an error through rewriters, then terminates |
//!
//! Every adapter forwards `close` straight to its source without touching any
//! state a pending `next` holds. Adapters stack in any order and keep that
//! property.
//!
//! # Example
//!
//! ```ignore
//! let (tx, events) = Sequence::<u32, String>::channel();
//!
//! let doubled = events
//!     .map_items(|n| async move { Ok(n * 2) })
//!     .on_complete(vec![Box::new(|| tracing::info!("stream finished"))]);
//!
//! tx.send(21)?;
//! assert_eq!(doubled.next().await, Some(Ok(42)));
//! doubled.close().await;
//! ```

mod complete;
mod map;
mod rewrite;
mod sequence;
mod source;

pub use complete::CompletionCallback;
pub use rewrite::ErrorRewriter;
pub use sequence::{AsyncSequence, Sequence};
pub use source::{SequenceSendError, SequenceSender};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{AsyncSequence, CompletionCallback, ErrorRewriter, Sequence, SequenceSender};
}
