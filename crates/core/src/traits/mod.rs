//! Collaborator traits injected into the orchestrator
//!
//! Implementations live in other crates (the HTTP gateway, host wiring) or in
//! tests as mocks.
//!
//! ```text
//! Speech:
//!   - Transcriber: finalized audio clip -> recognized text
//!
//! Persistence (external contract):
//!   - MessageArchive: "save message" for appended conversation messages
//! ```

mod archive;
mod speech;

pub use archive::{MessageArchive, NoopArchive};
pub use speech::Transcriber;
