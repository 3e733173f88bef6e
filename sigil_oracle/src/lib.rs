//! # sigil_oracle
//!
//! Thematic content for the sigil overlay: spell generation (name,
//! description, incantation, glow color) and short librarian chat replies.
//!
//! Calls are blocking and meant to run on a worker thread.  Spell generation
//! never fails from the caller's point of view; it degrades to
//! [`SpellInfo::fallback`].  Advice failures are returned as
//! [`OracleError`] so the chat layer can phrase its own apology.

pub mod error;
pub mod spell;
pub mod transport;

pub use error::OracleError;
pub use spell::{generate_spell, mystic_advice, try_generate_spell, ChatMessage, Role, SpellInfo};
pub use transport::{
    CannedTransport, CompletionRequest, GeminiConfig, GeminiTransport, OfflineTransport, Transport,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
