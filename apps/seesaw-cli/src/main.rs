use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::info;

use bus_transport::{BusAddress, MockBus};
use seesaw_driver::{regs, PinMode, Seesaw};

#[derive(Parser, Debug)]
#[command(
    name = "seesaw",
    version,
    about = "Seesaw helper-IC demo flows (mock bus backend)",
    disable_help_subcommand = true
)]
struct Cli {
    /// Device bus address (7-bit, e.g. 0x49)
    #[arg(long, default_value = "0x49", global = true)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handshake with the device and report version and compiled-in modules
    Identify {
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Toggle an output pin, the classic first flow against a fresh board
    Blink {
        /// GPIO pin to drive
        #[arg(long, default_value_t = 15)]
        pin: u8,
        /// Full on/off period in milliseconds
        #[arg(long, default_value_t = 1000)]
        period_ms: u64,
        /// Number of blinks
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
    /// Poll two ADC axes and a button mask, joystick-featherwing style
    Joystick {
        /// ADC pin for the X axis
        #[arg(long, default_value_t = 2)]
        x_pin: u8,
        /// ADC pin for the Y axis
        #[arg(long, default_value_t = 3)]
        y_pin: u8,
        /// Number of polls before exiting
        #[arg(long, default_value_t = 20)]
        samples: u32,
        /// Delay between polls in milliseconds
        #[arg(long, default_value_t = 10)]
        interval_ms: u64,
    },
    /// Read one EEPROM cell
    EepromRead {
        /// Cell address
        cell: u8,
    },
    /// Write one EEPROM cell
    EepromWrite {
        /// Cell address
        cell: u8,
        /// Value to store
        value: u8,
    },
}

#[derive(Serialize)]
struct Identity {
    addr: String,
    version: u32,
    product_id: u16,
    date_code: u16,
    options: u32,
    modules: Vec<&'static str>,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let addr = parse_addr(&cli.addr)?;

    let mut dev = Seesaw::connect(MockBus::new(), addr)?;
    info!(%addr, "device connected");

    match cli.command {
        Commands::Identify { json } => identify(&mut dev, json),
        Commands::Blink {
            pin,
            period_ms,
            count,
        } => blink(&mut dev, pin, period_ms, count),
        Commands::Joystick {
            x_pin,
            y_pin,
            samples,
            interval_ms,
        } => joystick(&mut dev, x_pin, y_pin, samples, interval_ms),
        Commands::EepromRead { cell } => {
            let value = dev.eeprom_read8(cell)?;
            println!("0x{cell:02X}\t0x{value:02X}");
            Ok(())
        }
        Commands::EepromWrite { cell, value } => {
            dev.eeprom_write8(cell, value)?;
            println!("wrote 0x{value:02X} to cell 0x{cell:02X}");
            Ok(())
        }
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn parse_addr(s: &str) -> Result<BusAddress> {
    let t = s.trim();
    let val = if let Some(hex) = t.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)?
    } else {
        t.parse::<u8>()?
    };
    BusAddress::new(val).ok_or_else(|| anyhow::anyhow!("bus address out of 7-bit range: {t}"))
}

fn identify(dev: &mut Seesaw<MockBus>, json: bool) -> Result<()> {
    let version = dev.get_version()?;
    let options = dev.get_options()?;
    let modules = module_names(options);
    let id = Identity {
        addr: dev.address().to_string(),
        version,
        product_id: (version & 0xFFFF) as u16,
        date_code: (version >> 16) as u16,
        options,
        modules,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&id)?);
    } else {
        println!("address:    {}", id.addr);
        println!("product id: {}", id.product_id);
        println!("date code:  {}", id.date_code);
        println!("modules:    {}", id.modules.join(", "));
    }
    Ok(())
}

/// Names of the modules whose option bits are set, indexed by base address.
fn module_names(options: u32) -> Vec<&'static str> {
    const KNOWN: [(u8, &str); 10] = [
        (regs::base::STATUS, "status"),
        (regs::base::GPIO, "gpio"),
        (regs::base::SERCOM0, "sercom0"),
        (regs::base::TIMER, "timer"),
        (regs::base::ADC, "adc"),
        (regs::base::DAC, "dac"),
        (regs::base::INTERRUPT, "interrupt"),
        (regs::base::DAP, "dap"),
        (regs::base::EEPROM, "eeprom"),
        (regs::base::NEOPIXEL, "neopixel"),
    ];
    let mut out = Vec::new();
    for (bit, name) in KNOWN {
        if options & (1u32 << bit) != 0 {
            out.push(name);
        }
    }
    out
}

fn blink(dev: &mut Seesaw<MockBus>, pin: u8, period_ms: u64, count: u32) -> Result<()> {
    dev.pin_mode(pin, PinMode::Output)?;
    let half = Duration::from_millis(period_ms / 2);
    for _ in 0..count {
        dev.digital_write(pin, true)?;
        thread::sleep(half);
        dev.digital_write(pin, false)?;
        thread::sleep(half);
    }
    Ok(())
}

fn joystick(
    dev: &mut Seesaw<MockBus>,
    x_pin: u8,
    y_pin: u8,
    samples: u32,
    interval_ms: u64,
) -> Result<()> {
    const BUTTON_RIGHT: u8 = 6;
    const BUTTON_DOWN: u8 = 7;
    const BUTTON_LEFT: u8 = 9;
    const BUTTON_UP: u8 = 10;
    const BUTTON_SEL: u8 = 14;
    let buttons: [(u8, &str); 5] = [
        (BUTTON_RIGHT, "right"),
        (BUTTON_DOWN, "down"),
        (BUTTON_LEFT, "left"),
        (BUTTON_UP, "up"),
        (BUTTON_SEL, "select"),
    ];
    let button_mask: u32 = buttons.iter().map(|&(b, _)| 1u32 << b).sum();

    dev.pin_mode_bulk(button_mask, PinMode::InputPullup)?;

    let mut last = (0u16, 0u16);
    for _ in 0..samples {
        let x = dev.analog_read(x_pin)?;
        let y = dev.analog_read(y_pin)?;
        if x.abs_diff(last.0) > 3 || y.abs_diff(last.1) > 3 {
            println!("x={x}\ty={y}");
            last = (x, y);
        }

        // Buttons idle high through the pull-ups; low means pressed
        let state = dev.digital_read_bulk(button_mask)?;
        for &(bit, name) in &buttons {
            if state & (1u32 << bit) == 0 {
                println!("button {name} pressed");
            }
        }
        thread::sleep(Duration::from_millis(interval_ms));
    }
    Ok(())
}
