//! seesaw-driver: register-access driver for the seesaw helper IC
//!
//! The seesaw is a companion microcontroller that exposes GPIO, ADC, PWM,
//! UART passthrough and a small EEPROM to a host over a two-wire bus. Every
//! command is two address bytes (module base, function register) optionally
//! followed by a payload; reads select the register, wait for the device to
//! prepare a response, then read back. This crate maps those byte sequences
//! to logical operations over an injected [`bus_transport::I2cBus`].

pub mod regs;

mod types;
pub use types::{pack_mask, unpack_u32, PinMode, SercomInten};

mod error;
pub use error::{Result, SeesawError};

mod device;
pub use device::{Seesaw, DEFAULT_READ_DELAY};
