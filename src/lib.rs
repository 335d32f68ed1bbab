#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

// Must come first so the logging macros are visible in every module below.
#[macro_use]
mod fmt;

mod config;
mod error;
mod fifo;
#[cfg(test)]
mod mock;
mod queue;
mod registry;
pub mod regs;
mod uart;
#[cfg(feature = "async-await")]
mod waker;

pub use config::{
    ClockSpeed, Config, DataBits, FifoLevel, FlowControl, Parity, PowerState, StopBits,
};
pub use error::{Error, QueueError, TransferError};
pub use queue::Queue;
pub use registry::Registry;
pub use regs::{Flags, Interrupt, Mmio, Reg, Registers, Status};
pub use uart::{BlockingUart, Direction, Transfer, Uart, WAIT_FOREVER};
