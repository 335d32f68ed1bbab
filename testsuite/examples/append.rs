//! Fire-and-forget transmission serviced by polling the service routine.

#![no_std]
#![no_main]

use apollo_uart::{Config, Error, Interrupt, Registry, TransferError};
use cortex_m_semihosting::hprintln;
use testsuite::{entry, exit_failure, exit_success, qemu_uart};

static UARTS: Registry<2> = Registry::new();

#[entry]
fn main() -> ! {
    let mut tx = [0; 32];
    let uart = UARTS.initialize(0, qemu_uart(0)).unwrap();

    assert_eq!(
        uart.append_tx(b"no queue"),
        Err(TransferError::from(Error::InvalidArgument))
    );

    uart.configure(Config {
        tx_buffer: Some(&mut tx),
        ..Config::default()
    })
    .unwrap();
    assert_eq!(
        uart.append_tx(&[]),
        Err(TransferError::from(Error::InvalidArgument))
    );

    for line in [&b"appended line one\n"[..], b"and line two\n"] {
        if uart.append_tx(line) != Ok(line.len()) {
            hprintln!("append failed");
            exit_failure();
        }
        // Stand-in for the interrupt handler.
        let mut polls = 0;
        while uart.interrupt_service(Interrupt::TX) != Ok(true) {
            polls += 1;
            if polls > 10_000 {
                hprintln!("transmitter never went idle");
                exit_failure();
            }
        }
    }

    assert_eq!(uart.fifo_write(b"raw fifo\n"), 9);

    hprintln!("append: ok");
    exit_success();
}
