use crate::{BusAddress, I2cBus, Result, TransportError};
use std::collections::VecDeque;
use tracing::trace;

/// One recorded write against a selected device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub address: BusAddress,
    pub bytes: Vec<u8>,
}

/// A simple in-process mock bus. Each bus instance is independent.
///
/// Writes are recorded in order together with the address they were issued
/// against. Reads replay scripted responses from a FIFO; when the queue is
/// empty the mock fills the read with an idle byte instead so that
/// handshake-driven flows run without scripting.
pub struct MockBus {
    selected: Option<BusAddress>,
    transactions: Vec<Transaction>,
    reads: VecDeque<Vec<u8>>,
    idle_fill: u8,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            selected: None,
            transactions: Vec::new(),
            reads: VecDeque::new(),
            // Seesaw hardware ID; lets an unscripted handshake succeed
            idle_fill: 0x55,
        }
    }

    /// Script the response for the next unserved read.
    pub fn push_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }

    /// Byte used to fill reads once the scripted queue is exhausted.
    pub fn set_idle_fill(&mut self, fill: u8) {
        self.idle_fill = fill;
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Drain the recorded writes, leaving the log empty.
    pub fn take_transactions(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cBus for MockBus {
    fn select(&mut self, address: BusAddress) -> Result<()> {
        trace!(%address, "mock select");
        self.selected = Some(address);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let address = self.selected.ok_or(TransportError::NotSelected)?;
        trace!(%address, len = bytes.len(), "mock write");
        self.transactions.push(Transaction {
            address,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let address = self.selected.ok_or(TransportError::NotSelected)?;
        trace!(%address, len, "mock read");
        match self.reads.pop_front() {
            Some(bytes) => {
                if bytes.len() != len {
                    return Err(TransportError::Io(format!(
                        "scripted response is {} bytes, caller asked for {len}",
                        bytes.len()
                    )));
                }
                Ok(bytes)
            }
            None => Ok(vec![self.idle_fill; len]),
        }
    }
}
