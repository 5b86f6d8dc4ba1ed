//! The thread core: keeps one comment thread's in-memory view consistent
//! with the remote store, and keeps image blobs from outliving or orphaning
//! their rows. The UI drives a single [`ThreadClient`] and observes its view
//! state through a `watch` channel.

pub mod attachments;
pub mod cleanup;
pub mod edit;
pub mod preview;
pub mod sync;
pub mod thread;

pub use attachments::Attachments;
pub use edit::{EditPhase, EditSession, ImageDisposition};
pub use preview::{PreviewHandle, PreviewHandles};
pub use sync::{ThreadSync, ThreadView};
pub use thread::ThreadClient;

#[cfg(test)]
pub(crate) mod testutil;
