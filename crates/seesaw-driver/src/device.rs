use std::thread;
use std::time::Duration;

use bus_transport::{BusAddress, I2cBus, TransportError};
use tracing::{debug, trace};

use crate::error::{Result, SeesawError};
use crate::regs::{self, adc, base, eeprom, gpio, sercom, status, timer};
use crate::types::{pack_mask, unpack_u32, PinMode, SercomInten};

/// Delay between selecting a register and reading its response.
///
/// Slow internal conversions (ADC sampling) need longer; callers of
/// [`Seesaw::read_register`] pick the delay. Under-delaying reads stale or
/// garbage bytes. This is a hardware timing contract and is never retried.
pub const DEFAULT_READ_DELAY: Duration = Duration::from_millis(1);

/// Settle time the device needs after a software reset before it responds.
const RESET_SETTLE: Duration = Duration::from_millis(500);

/// Settle time after rewriting the device's own bus address.
const ADDR_CHANGE_SETTLE: Duration = Duration::from_millis(250);

/// Settle time after an ADC conversion has been read out.
const ADC_SETTLE: Duration = Duration::from_millis(1);

/// Serial modules occupy bases SERCOM0..TIMER.
const NUM_SERCOMS: usize = 6;

/// Handle to one seesaw device on the bus.
///
/// Owns the device address and the injected transport. Operations are
/// blocking and the handle is not reentrant: the two-step write-then-read
/// sequences are not atomic, so concurrent use must be serialized
/// externally.
pub struct Seesaw<B> {
    addr: BusAddress,
    bus: B,
    sercom_inten: [SercomInten; NUM_SERCOMS],
}

impl<B: I2cBus> Seesaw<B> {
    /// Create a handle and run the reset/identify handshake.
    ///
    /// This is the only validation that a compatible device is present;
    /// every other operation assumes it succeeded.
    pub fn connect(bus: B, addr: BusAddress) -> Result<Self> {
        let mut dev = Self {
            addr,
            bus,
            sercom_inten: [SercomInten::default(); NUM_SERCOMS],
        };
        dev.begin()?;
        Ok(dev)
    }

    pub fn address(&self) -> BusAddress {
        self.addr
    }

    /// Reset the device, wait for it to settle, and verify the hardware ID.
    pub fn begin(&mut self) -> Result<()> {
        self.software_reset()?;
        thread::sleep(RESET_SETTLE);

        let id = self.read_u8(base::STATUS, status::HW_ID)?;
        if id != regs::HW_ID_CODE {
            return Err(SeesawError::Handshake { found: id });
        }
        debug!(addr = %self.addr, "seesaw handshake complete");
        Ok(())
    }

    /// Return the device to firmware defaults. All prior configuration
    /// (pin modes, interrupt enables) is lost.
    pub fn software_reset(&mut self) -> Result<()> {
        debug!(addr = %self.addr, "software reset");
        self.write_u8(base::STATUS, status::SWRST, 0xFF)
    }

    /// Bitmask of compiled-in modules, indexed by module base address.
    pub fn get_options(&mut self) -> Result<u32> {
        let buf = self.read_register(base::STATUS, status::OPTIONS, 4, DEFAULT_READ_DELAY)?;
        Ok(unpack_u32(&buf))
    }

    /// Firmware version word: date code in the upper 16 bits, product id in
    /// the lower 16.
    pub fn get_version(&mut self) -> Result<u32> {
        let buf = self.read_register(base::STATUS, status::VERSION, 4, DEFAULT_READ_DELAY)?;
        Ok(unpack_u32(&buf))
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        self.pin_mode_bulk(1u32 << pin, mode)
    }

    pub fn pin_mode_bulk(&mut self, pins: u32, mode: PinMode) -> Result<()> {
        let cmd = pack_mask(pins);
        match mode {
            PinMode::Output => self.write_register(base::GPIO, gpio::DIRSET_BULK, &cmd),
            PinMode::Input => self.write_register(base::GPIO, gpio::DIRCLR_BULK, &cmd),
            PinMode::InputPullup => {
                self.write_register(base::GPIO, gpio::DIRCLR_BULK, &cmd)?;
                self.write_register(base::GPIO, gpio::PULLENSET, &cmd)?;
                self.write_register(base::GPIO, gpio::BULK_SET, &cmd)
            }
        }
    }

    pub fn digital_write(&mut self, pin: u8, value: bool) -> Result<()> {
        self.digital_write_bulk(1u32 << pin, value)
    }

    pub fn digital_write_bulk(&mut self, pins: u32, value: bool) -> Result<()> {
        let cmd = pack_mask(pins);
        if value {
            self.write_register(base::GPIO, gpio::BULK_SET, &cmd)
        } else {
            self.write_register(base::GPIO, gpio::BULK_CLR, &cmd)
        }
    }

    pub fn digital_read(&mut self, pin: u8) -> Result<bool> {
        Ok(self.digital_read_bulk(1u32 << pin)? != 0)
    }

    /// Read the GPIO state of the pins in `pins`.
    ///
    /// The result is always a subset of `pins`. Only the low nibble of the
    /// first response byte carries state: pins 28-31 do not exist on the
    /// hardware and always read as 0.
    pub fn digital_read_bulk(&mut self, pins: u32) -> Result<u32> {
        let buf = self.read_register(base::GPIO, gpio::BULK, 4, DEFAULT_READ_DELAY)?;
        let state = u32::from(buf[0] & 0xF) << 24
            | u32::from(buf[1]) << 16
            | u32::from(buf[2]) << 8
            | u32::from(buf[3]);
        Ok(state & pins)
    }

    pub fn set_gpio_interrupts(&mut self, pins: u32, enabled: bool) -> Result<()> {
        let cmd = pack_mask(pins);
        if enabled {
            self.write_register(base::GPIO, gpio::INTENSET, &cmd)
        } else {
            self.write_register(base::GPIO, gpio::INTENCLR, &cmd)
        }
    }

    /// Read the 10-bit ADC value of `pin`.
    ///
    /// Pins without an ADC channel read as 0 without touching the bus.
    pub fn analog_read(&mut self, pin: u8) -> Result<u16> {
        let Some(channel) = adc_channel(pin) else {
            return Ok(0);
        };
        let buf = self.read_register(
            base::ADC,
            adc::CHANNEL_OFFSET + channel,
            2,
            DEFAULT_READ_DELAY,
        )?;
        let value = u16::from(buf[0]) << 8 | u16::from(buf[1]);
        thread::sleep(ADC_SETTLE);
        Ok(value)
    }

    /// Set the PWM duty cycle of `pin`.
    ///
    /// Pins without a PWM channel are ignored without touching the bus.
    pub fn analog_write(&mut self, pin: u8, value: u8) -> Result<()> {
        let Some(channel) = pwm_channel(pin) else {
            return Ok(());
        };
        self.write_register(base::TIMER, timer::PWM, &[channel, value])
    }

    pub fn enable_sercom_data_rdy_interrupt(&mut self, sercom: u8) -> Result<()> {
        self.set_sercom_data_rdy(sercom, true)
    }

    pub fn disable_sercom_data_rdy_interrupt(&mut self, sercom: u8) -> Result<()> {
        self.set_sercom_data_rdy(sercom, false)
    }

    fn set_sercom_data_rdy(&mut self, sercom_idx: u8, enabled: bool) -> Result<()> {
        let idx = usize::from(sercom_idx);
        if idx >= NUM_SERCOMS {
            return Ok(());
        }
        // Read-modify-write the mirrored bitfield; commit only once the
        // device accepted the new byte.
        let mut inten = self.sercom_inten[idx];
        inten.set_data_rdy(enabled);
        self.write_u8(base::SERCOM0 + sercom_idx, sercom::INTEN, inten.get())?;
        self.sercom_inten[idx] = inten;
        Ok(())
    }

    /// Read one byte from a serial module's data register.
    pub fn read_sercom_data(&mut self, sercom_idx: u8) -> Result<u8> {
        if usize::from(sercom_idx) >= NUM_SERCOMS {
            return Ok(0);
        }
        self.read_u8(base::SERCOM0 + sercom_idx, sercom::DATA)
    }

    pub fn uart_set_baud(&mut self, baud: u32) -> Result<()> {
        self.write_register(base::SERCOM0, sercom::BAUD, &baud.to_be_bytes())
    }

    pub fn eeprom_write8(&mut self, addr: u8, value: u8) -> Result<()> {
        self.eeprom_write(addr, &[value])
    }

    /// Write `buf` starting at cell `addr`; the device auto-increments the
    /// cell address per payload byte.
    pub fn eeprom_write(&mut self, addr: u8, buf: &[u8]) -> Result<()> {
        self.write_register(base::EEPROM, addr, buf)
    }

    pub fn eeprom_read8(&mut self, addr: u8) -> Result<u8> {
        self.read_u8(base::EEPROM, addr)
    }

    /// The bus address the device has persisted for itself.
    pub fn get_i2c_addr(&mut self) -> Result<u8> {
        self.read_u8(base::EEPROM, eeprom::I2C_ADDR)
    }

    /// Persist a new bus address, wait for the device to switch, then
    /// handshake against it. The handle follows the new address for all
    /// subsequent transactions.
    pub fn set_i2c_addr(&mut self, addr: BusAddress) -> Result<()> {
        debug!(old = %self.addr, new = %addr, "changing device bus address");
        self.eeprom_write8(eeprom::I2C_ADDR, addr.raw())?;
        thread::sleep(ADDR_CHANGE_SETTLE);
        self.addr = addr;
        self.begin()
    }

    /// Transmit `[module, function] ++ payload` as one bus write. An empty
    /// payload selects a register ahead of a read.
    pub fn write_register(&mut self, module: u8, function: u8, payload: &[u8]) -> Result<()> {
        trace!(
            "register write {module:#04x}.{function:#04x}, {} payload bytes",
            payload.len()
        );
        let mut frame = Vec::with_capacity(2 + payload.len());
        frame.push(module);
        frame.push(function);
        frame.extend_from_slice(payload);
        self.bus.select(self.addr)?;
        self.bus.write(&frame)?;
        Ok(())
    }

    /// Select a register, wait `delay` for the device to prepare its
    /// response, then read exactly `len` bytes back.
    pub fn read_register(
        &mut self,
        module: u8,
        function: u8,
        len: usize,
        delay: Duration,
    ) -> Result<Vec<u8>> {
        self.write_register(module, function, &[])?;
        thread::sleep(delay);
        let buf = self.bus.read(len)?;
        if buf.len() != len {
            return Err(TransportError::NoResponse.into());
        }
        Ok(buf)
    }

    /// Write a single-byte payload to a register.
    pub fn write_u8(&mut self, module: u8, function: u8, value: u8) -> Result<()> {
        self.write_register(module, function, &[value])
    }

    /// Read a single-byte response from a register.
    pub fn read_u8(&mut self, module: u8, function: u8) -> Result<u8> {
        let buf = self.read_register(module, function, 1, DEFAULT_READ_DELAY)?;
        Ok(buf[0])
    }
}

fn adc_channel(pin: u8) -> Option<u8> {
    regs::pins::ADC_INPUTS
        .iter()
        .position(|&p| p == pin)
        .map(|ch| ch as u8)
}

fn pwm_channel(pin: u8) -> Option<u8> {
    regs::pins::PWM_OUTPUTS
        .iter()
        .position(|&p| p == pin)
        .map(|ch| ch as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_transport::MockBus;
    use std::time::Instant;

    fn addr(raw: u8) -> BusAddress {
        BusAddress::new(raw).unwrap()
    }

    /// Handle over a fresh mock, skipping the handshake and its settle
    /// delay. Handshake behavior gets its own tests below.
    fn device() -> Seesaw<MockBus> {
        Seesaw {
            addr: addr(regs::DEFAULT_ADDR),
            bus: MockBus::new(),
            sercom_inten: [SercomInten::default(); NUM_SERCOMS],
        }
    }

    #[test]
    fn connect_resets_then_checks_hardware_id() {
        // Unscripted mock answers reads with 0x55, the hardware ID
        let mut dev = Seesaw::connect(MockBus::new(), addr(0x49)).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].address, addr(0x49));
        assert_eq!(log[0].bytes, vec![base::STATUS, status::SWRST, 0xFF]);
        assert_eq!(log[1].bytes, vec![base::STATUS, status::HW_ID]);
    }

    #[test]
    fn connect_fails_on_wrong_hardware_id() {
        let mut bus = MockBus::new();
        bus.push_read(&[0xAA]);
        let err = match Seesaw::connect(bus, addr(0x49)) {
            Err(e) => e,
            Ok(_) => panic!("handshake accepted a wrong hardware ID"),
        };
        assert!(matches!(err, SeesawError::Handshake { found: 0xAA }));
    }

    #[test]
    fn failed_handshake_performs_no_further_operations() {
        let mut dev = device();
        dev.bus.push_read(&[0x00]);
        assert!(dev.begin().is_err());
        // Reset write and hardware-ID select only
        assert_eq!(dev.bus.take_transactions().len(), 2);
    }

    #[test]
    fn pin_mode_bulk_input_pullup_emits_three_writes_in_order() {
        let mut dev = device();
        dev.pin_mode_bulk(0b0110, PinMode::InputPullup).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].bytes, vec![base::GPIO, gpio::DIRCLR_BULK, 0, 0, 0, 6]);
        assert_eq!(log[1].bytes, vec![base::GPIO, gpio::PULLENSET, 0, 0, 0, 6]);
        assert_eq!(log[2].bytes, vec![base::GPIO, gpio::BULK_SET, 0, 0, 0, 6]);
    }

    #[test]
    fn pin_mode_output_and_input_set_direction() {
        let mut dev = device();
        dev.pin_mode(15, PinMode::Output).unwrap();
        dev.pin_mode(15, PinMode::Input).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(
            log[0].bytes,
            vec![base::GPIO, gpio::DIRSET_BULK, 0x00, 0x00, 0x80, 0x00]
        );
        assert_eq!(
            log[1].bytes,
            vec![base::GPIO, gpio::DIRCLR_BULK, 0x00, 0x00, 0x80, 0x00]
        );
    }

    #[test]
    fn digital_write_bulk_sets_and_clears() {
        let mut dev = device();
        dev.digital_write_bulk(0x0000_8001, true).unwrap();
        dev.digital_write_bulk(0x0000_8001, false).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(
            log[0].bytes,
            vec![base::GPIO, gpio::BULK_SET, 0x00, 0x00, 0x80, 0x01]
        );
        assert_eq!(
            log[1].bytes,
            vec![base::GPIO, gpio::BULK_CLR, 0x00, 0x00, 0x80, 0x01]
        );
    }

    #[test]
    fn digital_read_bulk_truncates_upper_nibble_and_masks() {
        let mut dev = device();
        dev.bus.push_read(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let all = dev.digital_read_bulk(u32::MAX).unwrap();
        // Pins 28-31 do not exist; everything else was high
        assert_eq!(all, 0x0FFF_FFFF);

        dev.bus.push_read(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let masked = dev.digital_read_bulk(0x0000_00F0).unwrap();
        assert_eq!(masked, 0x0000_00F0);
        assert_eq!(masked & !0x0000_00F0, 0);

        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::GPIO, gpio::BULK]);
    }

    #[test]
    fn digital_read_single_pin() {
        let mut dev = device();
        dev.bus.push_read(&[0x00, 0x00, 0x00, 0x02]);
        assert!(dev.digital_read(1).unwrap());
        dev.bus.push_read(&[0x00, 0x00, 0x00, 0x02]);
        assert!(!dev.digital_read(2).unwrap());
    }

    #[test]
    fn gpio_interrupts_use_set_and_clear_registers() {
        let mut dev = device();
        dev.set_gpio_interrupts(0x0001_0000, true).unwrap();
        dev.set_gpio_interrupts(0x0001_0000, false).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(
            log[0].bytes,
            vec![base::GPIO, gpio::INTENSET, 0x00, 0x01, 0x00, 0x00]
        );
        assert_eq!(
            log[1].bytes,
            vec![base::GPIO, gpio::INTENCLR, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn analog_read_unmapped_pin_is_zero_without_bus_traffic() {
        let mut dev = device();
        for pin in [0, 1, 6, 7, 42] {
            assert_eq!(dev.analog_read(pin).unwrap(), 0);
        }
        assert!(dev.bus.transactions().is_empty());
    }

    #[test]
    fn analog_read_maps_pin_to_channel_and_decodes() {
        let mut dev = device();
        dev.bus.push_read(&[0x03, 0xFF]);
        let started = Instant::now();
        let value = dev.analog_read(4).unwrap();
        // Register-select delay plus post-read settle
        assert!(started.elapsed() >= Duration::from_millis(2));
        assert_eq!(value, 1023);
        let log = dev.bus.take_transactions();
        assert_eq!(log.len(), 1);
        // Pin 4 is ADC channel 2
        assert_eq!(log[0].bytes, vec![base::ADC, adc::CHANNEL_OFFSET + 2]);
    }

    #[test]
    fn analog_write_unmapped_pin_is_noop() {
        let mut dev = device();
        for pin in [0, 3, 8, 42] {
            dev.analog_write(pin, 0xFF).unwrap();
        }
        assert!(dev.bus.transactions().is_empty());
    }

    #[test]
    fn analog_write_maps_pin_to_channel() {
        let mut dev = device();
        dev.analog_write(6, 128).unwrap();
        let log = dev.bus.take_transactions();
        // Pin 6 is PWM channel 2
        assert_eq!(log[0].bytes, vec![base::TIMER, timer::PWM, 2, 128]);
    }

    #[test]
    fn sercom_data_rdy_interrupt_read_modify_writes() {
        let mut dev = device();
        dev.enable_sercom_data_rdy_interrupt(0).unwrap();
        dev.enable_sercom_data_rdy_interrupt(1).unwrap();
        dev.disable_sercom_data_rdy_interrupt(0).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::SERCOM0, sercom::INTEN, 0b10]);
        assert_eq!(log[1].bytes, vec![base::SERCOM0 + 1, sercom::INTEN, 0b10]);
        assert_eq!(log[2].bytes, vec![base::SERCOM0, sercom::INTEN, 0b00]);
        // Each module mirrors its own state
        assert!(dev.sercom_inten[1].data_rdy());
        assert!(!dev.sercom_inten[0].data_rdy());
    }

    #[test]
    fn sercom_out_of_range_is_noop() {
        let mut dev = device();
        dev.enable_sercom_data_rdy_interrupt(6).unwrap();
        assert_eq!(dev.read_sercom_data(6).unwrap(), 0);
        assert!(dev.bus.transactions().is_empty());
    }

    #[test]
    fn read_sercom_data_reads_one_byte() {
        let mut dev = device();
        dev.bus.push_read(&[0x42]);
        assert_eq!(dev.read_sercom_data(0).unwrap(), 0x42);
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::SERCOM0, sercom::DATA]);
    }

    #[test]
    fn uart_set_baud_is_big_endian() {
        let mut dev = device();
        dev.uart_set_baud(115_200).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(
            log[0].bytes,
            vec![base::SERCOM0, sercom::BAUD, 0x00, 0x01, 0xC2, 0x00]
        );
    }

    #[test]
    fn eeprom_write_sends_raw_bytes_at_cell() {
        let mut dev = device();
        dev.eeprom_write(0x10, &[1, 2, 3]).unwrap();
        dev.eeprom_write8(0x20, 0x99).unwrap();
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::EEPROM, 0x10, 1, 2, 3]);
        assert_eq!(log[1].bytes, vec![base::EEPROM, 0x20, 0x99]);
    }

    #[test]
    fn eeprom_read8_selects_cell() {
        let mut dev = device();
        dev.bus.push_read(&[0x07]);
        assert_eq!(dev.eeprom_read8(0x21).unwrap(), 0x07);
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::EEPROM, 0x21]);
    }

    #[test]
    fn get_i2c_addr_reads_address_cell() {
        let mut dev = device();
        dev.bus.push_read(&[0x49]);
        assert_eq!(dev.get_i2c_addr().unwrap(), 0x49);
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::EEPROM, eeprom::I2C_ADDR]);
    }

    #[test]
    fn set_i2c_addr_writes_cell_then_handshakes_new_address() {
        let mut dev = device();
        dev.bus.push_read(&[0x55]);
        let started = Instant::now();
        dev.set_i2c_addr(addr(0x50)).unwrap();
        // Address-change settle plus post-reset settle
        assert!(started.elapsed() >= Duration::from_millis(750));

        let log = dev.bus.take_transactions();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].address, addr(0x49));
        assert_eq!(log[0].bytes, vec![base::EEPROM, eeprom::I2C_ADDR, 0x50]);
        assert_eq!(log[1].address, addr(0x50));
        assert_eq!(log[1].bytes, vec![base::STATUS, status::SWRST, 0xFF]);
        assert_eq!(log[2].address, addr(0x50));
        assert_eq!(log[2].bytes, vec![base::STATUS, status::HW_ID]);
        assert_eq!(dev.address(), addr(0x50));
    }

    #[test]
    fn get_version_decodes_big_endian() {
        let mut dev = device();
        dev.bus.push_read(&[0x00, 0x01, 0x02, 0x03]);
        assert_eq!(dev.get_version().unwrap(), 0x0001_0203);
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::STATUS, status::VERSION]);
    }

    #[test]
    fn get_options_decodes_big_endian() {
        let mut dev = device();
        // STATUS, GPIO, ADC and EEPROM compiled in
        let options = 1 << base::STATUS | 1 << base::GPIO | 1 << base::ADC | 1 << base::EEPROM;
        dev.bus.push_read(&pack_mask(options));
        assert_eq!(dev.get_options().unwrap(), options);
        let log = dev.bus.take_transactions();
        assert_eq!(log[0].bytes, vec![base::STATUS, status::OPTIONS]);
    }
}
