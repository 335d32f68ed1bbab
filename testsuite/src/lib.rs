#![no_std]

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use apollo_uart::Mmio;
use cortex_m_semihosting::debug::{self, EXIT_FAILURE, EXIT_SUCCESS};
use embedded_hal::delay::DelayNs;
use panic_semihosting as _;

pub use cortex_m_rt::entry;

/// Base address of UART0 on the LM3S6965. UART1 follows at the next 4 KiB.
const UART0_BASE: usize = 0x4000_C000;

/// Nominal core clock of the emulated board.
const CPU_HZ: u32 = 12_000_000;

pub fn exit_success() -> ! {
    debug::exit(EXIT_SUCCESS);
    #[allow(clippy::empty_loop)]
    loop {}
}

pub fn exit_failure() -> ! {
    debug::exit(EXIT_FAILURE);
    #[allow(clippy::empty_loop)]
    loop {}
}

/// Register block of UART `module` on the emulated board.
///
/// QEMU maps the first `-serial` argument to UART0, the second to UART1.
pub fn qemu_uart(module: usize) -> Mmio {
    // SAFETY: The LM3S6965 UARTs are PL011 blocks at these addresses, and every
    // example claims each module once through a `Registry`.
    unsafe { Mmio::new(module, UART0_BASE + module * 0x1000) }
}

/// Busy-wait delay calibrated to the nominal core clock.
///
/// QEMU does not emulate instruction timing, so this only bounds the number
/// of polls, not wall time.
pub struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (u64::from(ns) * u64::from(CPU_HZ)).div_ceil(1_000_000_000);
        cortex_m::asm::delay(cycles.max(1) as u32);
    }
}

/// Yield once to allow other tasks to run.
pub async fn yield_once() {
    let mut yielded = false;
    core::future::poll_fn(|_cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            Poll::Pending
        }
    })
    .await
}

/// Minimal block_on executor for testing.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);

    const VTABLE: RawWakerVTable = RawWakerVTable::new(
        |_| RawWaker::new(core::ptr::null(), &VTABLE),
        |_| {},
        |_| {},
        |_| {},
    );
    let raw_waker = RawWaker::new(core::ptr::null(), &VTABLE);
    // SAFETY: Every vtable function ignores the data pointer.
    let waker = unsafe { Waker::from_raw(raw_waker) };
    let mut cx = Context::from_waker(&waker);

    loop {
        if let Poll::Ready(val) = fut.as_mut().poll(&mut cx) {
            return val;
        }
        cortex_m::asm::nop();
    }
}

/// Join two futures, polling them alternately until both complete.
pub async fn join<A, B, T, U>(a: A, b: B) -> (T, U)
where
    A: Future<Output = T>,
    B: Future<Output = U>,
{
    let mut a = pin!(a);
    let mut b = pin!(b);
    let mut a_done: Option<T> = None;
    let mut b_done: Option<U> = None;

    core::future::poll_fn(|cx| {
        if a_done.is_none() {
            if let Poll::Ready(val) = a.as_mut().poll(cx) {
                a_done = Some(val);
            }
        }
        if b_done.is_none() {
            if let Poll::Ready(val) = b.as_mut().poll(cx) {
                b_done = Some(val);
            }
        }
        match (a_done.take(), b_done.take()) {
            (Some(a), Some(b)) => Poll::Ready((a, b)),
            (a, b) => {
                a_done = a;
                b_done = b;
                Poll::Pending
            }
        }
    })
    .await
}
