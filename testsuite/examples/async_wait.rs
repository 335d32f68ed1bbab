//! Wait for the transmitter to go idle while a polled service routine runs.

#![no_std]
#![no_main]

use apollo_uart::{Config, Interrupt, Registry};
use cortex_m_semihosting::hprintln;
use testsuite::{block_on, entry, exit_success, join, qemu_uart, yield_once};

static UARTS: Registry<2> = Registry::new();

#[entry]
fn main() -> ! {
    let mut tx = [0; 8];
    let uart = UARTS.initialize(0, qemu_uart(0)).unwrap();
    uart.configure(Config {
        tx_buffer: Some(&mut tx),
        ..Config::default()
    })
    .unwrap();

    let message = b"async tx idle\n";
    let mut sent = 0;
    while sent < message.len() {
        sent += uart.write_nonblocking(&message[sent..]).unwrap();
    }

    let service = async {
        let mut polls = 0u32;
        while uart.interrupt_service(Interrupt::TX) != Ok(true) {
            polls += 1;
            yield_once().await;
        }
        polls
    };
    let ((), polls) = block_on(join(uart.wait_for_tx_idle(), service));
    hprintln!("service polled {} extra times", polls);

    uart.write_nonblocking(b"done\n").unwrap();

    hprintln!("async_wait: ok");
    exit_success();
}
