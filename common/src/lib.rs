//! Shared building blocks for the LiquidRoute wallet workspace.
//!
//! Every error enum in `wallet-sdk` and `wallet-demo` carries an
//! [`ErrorLocation`] so a failure logged far away from its origin still
//! points at the line that produced it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
