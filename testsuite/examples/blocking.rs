//! `core::fmt` and `embedded-io` output through the blocking adaptor.

#![no_std]
#![no_main]

use core::fmt::Write as _;

use apollo_uart::{Config, Registry};
use cortex_m_semihosting::hprintln;
use embedded_io::{ReadReady, WriteReady};
use testsuite::{CycleDelay, entry, exit_success, qemu_uart};

static UARTS: Registry<2> = Registry::new();

#[entry]
fn main() -> ! {
    let mut tx = [0; 16];
    let uart = UARTS.initialize(0, qemu_uart(0)).unwrap();
    uart.configure(Config {
        baudrate: 57_600,
        tx_buffer: Some(&mut tx),
        ..Config::default()
    })
    .unwrap();

    let mut port = uart.blocking(CycleDelay);
    assert!(!port.read_ready().unwrap());
    assert!(port.write_ready().unwrap());

    writeln!(port, "{} + {} = {}", 2, 3, 2 + 3).unwrap();
    embedded_io::Write::write_all(&mut port, b"a line longer than the sixteen byte queue\n").unwrap();
    embedded_io::Write::flush(&mut port).unwrap();

    hprintln!("blocking: ok");
    exit_success();
}
