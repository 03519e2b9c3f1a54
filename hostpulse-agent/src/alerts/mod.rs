//! Alert engine: threshold evaluation, cooldown deduplication, dispatch
//!
//! Control flow of one cycle:
//! snapshot -> evaluate -> filter (cooldown) -> dispatch -> advance + save

pub mod cooldown;
pub mod dispatch;
pub mod evaluator;

pub use cooldown::{advance, filter, CooldownState, CooldownStore, StateError};
pub use dispatch::{compose_message, dispatch, DispatchOutcome, MESSAGE_TAG};
pub use evaluator::{evaluate, Violation};
