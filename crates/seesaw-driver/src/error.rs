use bus_transport::TransportError;
use thiserror::Error;

pub type Result<T, E = SeesawError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SeesawError {
    #[error("hardware ID mismatch: device reported 0x{found:02X}, expected 0x55; check wiring")]
    Handshake { found: u8 },
    #[error("bus transport error: {0}")]
    Transport(#[from] TransportError),
}
