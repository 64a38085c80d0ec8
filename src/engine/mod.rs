//! Core engine — wager accounting, reel timing and the spin lifecycle.

pub mod animation;
pub mod machine;
pub mod orchestrator;
pub mod wager;
