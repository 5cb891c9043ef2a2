use crate::{BusAddress, Result};

/// A minimal blocking two-wire bus interface.
///
/// A transaction is select-then-write, optionally followed by a read from
/// the still-selected device. Implementations block for the duration of
/// each call.
pub trait I2cBus {
    /// Address a specific device on the shared bus before a transaction.
    fn select(&mut self, address: BusAddress) -> Result<()>;

    /// Write a byte sequence to the currently selected device.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes from the currently selected device.
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;
}
