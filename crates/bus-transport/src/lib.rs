//! bus-transport: two-wire register bus abstractions
//!
//! This crate provides the trait and types for talking to devices on a shared
//! two-wire bus, with feature-gated backends. The default build enables a
//! `mock` backend so that drivers can compile and test on any host without
//! native bus hardware.

mod types;
pub use types::BusAddress;

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::I2cBus;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, Transaction};
