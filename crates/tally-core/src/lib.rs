//! Core types and trait definitions for the Tally commitment engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Every operation that depends on the current time takes it as an explicit
//! `now` parameter; nothing here reads the wall clock.

pub mod analytics;
pub mod category;
pub mod commitment;
pub mod cycle;
pub mod error;
pub mod history;
pub mod store;

pub use error::{Error, Result};
