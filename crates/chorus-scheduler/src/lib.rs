//! # chorus-scheduler
//!
//! Decides which participants reply to a message, when, and in what stance.
//!
//! The leaf components (queue, context window, mention resolver, selector,
//! strategy engine, delay computation, sleep state) are plain data structures
//! and pure functions over an injected RNG. The [`Orchestrator`] owns all of
//! them behind one lock and drives the timers.

pub mod context;
pub mod delay;
pub mod driver;
pub mod events;
pub mod mentions;
pub mod orchestrator;
pub mod queue;
pub mod selector;
pub mod sleep;
pub mod strategy;

pub use events::ChorusEvent;
pub use orchestrator::{Orchestrator, Registration, StatusSnapshot};
