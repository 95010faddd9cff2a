//! Pure scheduling decisions for the dispatch coordinator.

mod pacing;

pub use pacing::{admission_deadline, slot_open};
