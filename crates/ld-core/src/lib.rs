//! ld-core: Shared types for LuckyDraw
//!
//! Prize tiers, their display/audio metadata, app settings and the
//! workspace error type. Everything here is plain data; the draw and the
//! store live in `ld-draw` and `ld-state`.

mod error;
mod settings;
mod tier;

pub use error::*;
pub use settings::*;
pub use tier::*;
