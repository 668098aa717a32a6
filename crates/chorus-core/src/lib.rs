//! # chorus-core
//!
//! Core types, traits, configuration, and error handling for the Chorus scheduler.

pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod participant;
pub mod traits;
