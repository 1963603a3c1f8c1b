//! ld-state: Tier store, persistence, settings documents and draw sessions
//!
//! The store is the only owner of the tier list. Draw outcomes reach it
//! through `TierStore::record_win`; the session ties engine and store
//! together behind a one-draw-in-flight guard.

mod document;
mod kv;
mod session;
mod store;

pub use document::*;
pub use kv::*;
pub use session::*;
pub use store::*;
