//! Configure UART0, send through the transmit queue, read with timeouts and
//! power cycle with register retention.

#![no_std]
#![no_main]

use apollo_uart::{Config, Error, PowerState, Reg, Registers, Registry, Transfer, WAIT_FOREVER};
use cortex_m_semihosting::hprintln;
use testsuite::{CycleDelay, entry, exit_failure, exit_success, qemu_uart};

static UARTS: Registry<2> = Registry::new();

#[entry]
fn main() -> ! {
    let mut delay = CycleDelay;
    let mut tx = [0; 64];
    let mut rx = [0; 16];

    let uart = match UARTS.initialize(0, qemu_uart(0)) {
        Ok(uart) => uart,
        Err(e) => {
            hprintln!("initialize failed: {}", e);
            exit_failure();
        }
    };
    if UARTS.initialize(0, qemu_uart(0)).err() != Some(Error::InvalidOperation) {
        hprintln!("module claimed twice");
        exit_failure();
    }

    let config = Config {
        baudrate: 115_200,
        tx_buffer: Some(&mut tx),
        rx_buffer: Some(&mut rx),
        ..Config::default()
    };
    if let Err(e) = uart.configure(config) {
        hprintln!("configure failed: {}", e);
        exit_failure();
    }
    let baudrate = uart.baudrate();

    let sent = uart.write_timeout(b"hello from uart0\n", WAIT_FOREVER, &mut delay);
    assert_eq!(sent, Ok(17));

    let mut line = *b"transfer write\n";
    assert_eq!(
        uart.transfer(Transfer::from_raw(0, &mut line).unwrap(), 10, &mut delay),
        Ok(15)
    );
    uart.tx_flush(&mut delay);

    // Nothing is connected to the receive side.
    let mut buf = [0; 4];
    assert_eq!(uart.read_timeout(&mut buf, 0, &mut delay), Ok(0));
    let timed_out = uart.read_timeout(&mut buf, 5, &mut delay).unwrap_err();
    assert_eq!(timed_out.error, Error::Timeout);
    assert_eq!(timed_out.transferred, 0);

    uart.power_control(PowerState::DeepSleep, true).unwrap();
    assert_eq!(uart.registers().read(Reg::Cr), 0);
    uart.power_control(PowerState::Wake, true).unwrap();
    assert_eq!(uart.baudrate(), baudrate);
    assert_eq!(uart.registers().read(Reg::Ibrd), 13);
    assert_eq!(
        uart.power_control(PowerState::Wake, true),
        Err(Error::InvalidOperation)
    );

    uart.write_timeout(b"awake again\n", WAIT_FOREVER, &mut delay)
        .unwrap();
    uart.tx_flush(&mut delay);

    uart.deinitialize();
    if UARTS.initialize(0, qemu_uart(0)).is_err() {
        hprintln!("module not released");
        exit_failure();
    }

    hprintln!("basic: ok");
    exit_success();
}
