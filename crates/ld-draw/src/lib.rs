//! # ld-draw — Weighted prize draw for LuckyDraw
//!
//! Picks at most one prize tier per draw with a cumulative probability walk
//! over the tier list, honouring per-tier stock.
//!
//! ## Architecture
//!
//! ```text
//! DrawEngine (owns RNG + stats)
//!     │
//!     ├── all tiers exhausted? ──> NoPrize (no roll)
//!     │
//!     └── roll r ∈ [0, 100)
//!           │
//!           v
//!     select_tier(tiers, r) ──> DrawOutcome
//! ```
//!
//! `select_tier` is the only place a winner is chosen. Everything that
//! needs a result (the session controller, the CLI, replay tools) goes
//! through it, either directly with a known roll or via `DrawEngine`.

pub mod engine;
pub mod select;

pub use engine::*;
pub use select::*;
