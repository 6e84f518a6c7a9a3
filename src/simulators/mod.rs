//! Circuit simulators
//!
//! The [`Circuit`] front end owns one state representation and routes
//! channel and preparation requests to it.

pub mod circuit;

pub use circuit::Circuit;
