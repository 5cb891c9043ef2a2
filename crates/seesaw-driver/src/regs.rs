//! The seesaw register map.
//!
//! A register address is a (module base, function register) byte pair; both
//! bytes precede any payload on the wire.

/// Hardware ID code reported by STATUS.HW_ID on a healthy device.
pub const HW_ID_CODE: u8 = 0x55;

/// Factory-default bus address of the helper IC.
pub const DEFAULT_ADDR: u8 = 0x49;

pub mod base {
    //! Module base addresses.
    //!
    //! The base value doubles as the module's bit index in STATUS.OPTIONS.
    pub const STATUS: u8 = 0x00;
    pub const GPIO: u8 = 0x01;
    pub const SERCOM0: u8 = 0x02;
    pub const TIMER: u8 = 0x08;
    pub const ADC: u8 = 0x09;
    pub const DAC: u8 = 0x0A;
    pub const INTERRUPT: u8 = 0x0B;
    pub const DAP: u8 = 0x0C;
    pub const EEPROM: u8 = 0x0D;
    pub const NEOPIXEL: u8 = 0x0E;
}

pub mod status {
    //! Status module function registers.
    pub const HW_ID: u8 = 0x01;
    pub const VERSION: u8 = 0x02;
    pub const OPTIONS: u8 = 0x03;
    pub const SWRST: u8 = 0x7F;
}

pub mod gpio {
    //! GPIO module function registers. All act on 32-bit pin masks.
    pub const DIRSET_BULK: u8 = 0x02;
    pub const DIRCLR_BULK: u8 = 0x03;
    pub const BULK: u8 = 0x04;
    pub const BULK_SET: u8 = 0x05;
    pub const BULK_CLR: u8 = 0x06;
    pub const BULK_TOGGLE: u8 = 0x07;
    pub const INTENSET: u8 = 0x08;
    pub const INTENCLR: u8 = 0x09;
    pub const INTFLAG: u8 = 0x0A;
    pub const PULLENSET: u8 = 0x0B;
    pub const PULLENCLR: u8 = 0x0C;
}

pub mod timer {
    //! Timer module function registers.
    pub const STATUS: u8 = 0x00;
    pub const PWM: u8 = 0x01;
}

pub mod adc {
    //! ADC module function registers.
    pub const STATUS: u8 = 0x00;
    pub const INTEN: u8 = 0x02;
    pub const INTENCLR: u8 = 0x03;
    pub const WINMODE: u8 = 0x04;
    pub const WINTHRESH: u8 = 0x05;
    /// Channel n is read at CHANNEL_OFFSET + n.
    pub const CHANNEL_OFFSET: u8 = 0x07;
}

pub mod sercom {
    //! Serial module function registers, relative to SERCOM0 + index.
    pub const STATUS: u8 = 0x00;
    pub const INTEN: u8 = 0x02;
    pub const INTENCLR: u8 = 0x03;
    pub const BAUD: u8 = 0x04;
    pub const DATA: u8 = 0x05;
}

pub mod eeprom {
    //! EEPROM cells with a fixed meaning. Other cells are free for callers.
    /// Cell holding the device's own bus address.
    pub const I2C_ADDR: u8 = 0x3F;
}

pub mod pins {
    //! Fixed pin-to-channel tables, in channel order.
    pub const ADC_INPUTS: [u8; 4] = [0x02, 0x03, 0x04, 0x05];
    pub const PWM_OUTPUTS: [u8; 4] = [0x04, 0x05, 0x06, 0x07];
}
