//! Non-blocking, timed and flushed transfers from caller context.

use embedded_hal::delay::DelayNs;

use super::{State, Uart};
use crate::error::{Error, TransferError};
use crate::fifo;
use crate::queue::Queue;
use crate::regs::{FIFO_DEPTH, Flags, Interrupt, Reg, Registers};

/// Timeout value that never expires.
pub const WAIT_FOREVER: u32 = u32::MAX;

/// Direction of a [`Transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Direction {
    /// Caller to UART.
    Write = 0,
    /// UART to caller.
    Read = 1,
}

impl TryFrom<u32> for Direction {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self, Error> {
        match raw {
            0 => Ok(Direction::Write),
            1 => Ok(Direction::Read),
            _ => Err(Error::InvalidOperation),
        }
    }
}

/// A request for [`Uart::transfer`].
#[derive(Debug)]
pub enum Transfer<'b> {
    /// Send these bytes.
    Write(&'b [u8]),
    /// Fill this buffer.
    Read(&'b mut [u8]),
}

impl<'b> Transfer<'b> {
    /// Build a request from a raw direction code, 0 for write and 1 for read.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] for any other code.
    pub fn from_raw(direction: u32, buf: &'b mut [u8]) -> Result<Self, Error> {
        Ok(match Direction::try_from(direction)? {
            Direction::Write => Transfer::Write(buf),
            Direction::Read => Transfer::Read(buf),
        })
    }

    /// Which way the bytes move.
    pub fn direction(&self) -> Direction {
        match self {
            Transfer::Write(_) => Direction::Write,
            Transfer::Read(_) => Direction::Read,
        }
    }

    /// Number of bytes requested.
    pub fn len(&self) -> usize {
        match self {
            Transfer::Write(data) => data.len(),
            Transfer::Read(buf) => buf.len(),
        }
    }

    /// True for a zero-byte request.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, R: Registers> Uart<'a, R> {
    /// Read directly from the receive FIFO, bypassing the receive queue.
    ///
    /// # Errors
    ///
    /// [`Error::BusError`] when a byte carries a receive error. The error
    /// reports the bytes stored before it.
    pub fn fifo_read(&self, buf: &mut [u8]) -> Result<usize, TransferError> {
        fifo::read(&self.regs, buf)
    }

    /// Write directly to the transmit FIFO, bypassing the transmit queue.
    ///
    /// Returns how many bytes fit.
    pub fn fifo_write(&self, data: &[u8]) -> usize {
        fifo::write(&self.regs, data)
    }

    /// Read whatever is available right now, up to `buf.len()` bytes.
    ///
    /// With a receive queue, the hardware FIFO is first drained into the
    /// queue and the caller is served from the queue. Without one, bytes come
    /// straight from the FIFO.
    ///
    /// Bytes that do not fit in the queue stay in the hardware FIFO for the
    /// next call, so a full queue is not an error here.
    ///
    /// # Errors
    ///
    /// [`Error::BusError`] when a received byte carried a receive error.
    /// Bytes delivered to `buf` before the error are reported in
    /// [`TransferError::transferred`].
    pub fn read_nonblocking(&self, buf: &mut [u8]) -> Result<usize, TransferError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.with_state(|state, regs| {
            let Some(rx) = state.rx.as_mut() else {
                return fifo::read(regs, buf);
            };
            let mut update = rx_queue_update(regs, rx);
            let n = buf.len().min(rx.data_left());
            rx.get(&mut buf[..n]).map_err(|e| TransferError::new(e.into(), 0))?;
            if update == Err(Error::RxQueueFull) {
                // Dequeuing made room. Whatever still does not fit waits in the FIFO.
                update = match rx_queue_update(regs, rx) {
                    Err(Error::RxQueueFull) => Ok(()),
                    other => other,
                };
            }
            update.map(|()| n).map_err(|error| TransferError::new(error, n))
        })
    }

    /// Queue or send as much of `data` as possible right now.
    ///
    /// With a transmit queue, bytes are queued up to the free space and the
    /// queue is then drained into the hardware FIFO. Without one, bytes go
    /// straight to the FIFO. Returns the number of bytes accepted.
    pub fn write_nonblocking(&self, data: &[u8]) -> Result<usize, TransferError> {
        if data.is_empty() {
            return Ok(0);
        }
        self.with_state(|state, regs| {
            let Some(tx) = state.tx.as_mut() else {
                return Ok(fifo::write(regs, data));
            };
            let n = data.len().min(tx.space_left());
            tx.add(&data[..n]).map_err(|e| TransferError::new(e.into(), 0))?;
            tx_queue_update(regs, tx);
            if !tx.is_empty() {
                // The queue service may have disarmed TX after an earlier drain.
                regs.modify(Reg::Ier, |v| v | Interrupt::TX.bits());
            }
            Ok(n)
        })
    }

    /// Fill `buf`, retrying about once per millisecond for up to `timeout_ms`.
    ///
    /// A `timeout_ms` of 0 makes a single non-blocking attempt.
    /// [`WAIT_FOREVER`] retries until `buf` is full.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when time ran out first, or the first error of
    /// [`Uart::read_nonblocking`]. Either way the error reports the bytes
    /// already in `buf`.
    pub fn read_timeout(
        &self,
        buf: &mut [u8],
        timeout_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<usize, TransferError> {
        if timeout_ms == 0 {
            return self.read_nonblocking(buf);
        }
        let len = buf.len();
        retry(len, timeout_ms, delay, |done| {
            self.read_nonblocking(&mut buf[done..])
        })
    }

    /// Send all of `data`, retrying about once per millisecond for up to `timeout_ms`.
    ///
    /// Timeout values work as for [`Uart::read_timeout`].
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] with the number of bytes accepted so far.
    pub fn write_timeout(
        &self,
        data: &[u8],
        timeout_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<usize, TransferError> {
        if timeout_ms == 0 {
            return self.write_nonblocking(data);
        }
        retry(data.len(), timeout_ms, delay, |done| {
            self.write_nonblocking(&data[done..])
        })
    }

    /// Run a read or write request with a timeout.
    ///
    /// See [`Uart::read_timeout`] and [`Uart::write_timeout`].
    pub fn transfer(
        &self,
        transfer: Transfer<'_>,
        timeout_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<usize, TransferError> {
        match transfer {
            Transfer::Write(data) => self.write_timeout(data, timeout_ms, delay),
            Transfer::Read(buf) => self.read_timeout(buf, timeout_ms, delay),
        }
    }

    /// Wait until every accepted byte has left the transmitter.
    ///
    /// Polls once per character time. Queued bytes are pushed into the FIFO
    /// while waiting, so this also completes with the TX interrupt unwired.
    /// There is no timeout: a transmitter held off by flow control blocks
    /// here indefinitely.
    pub fn tx_flush(&self, delay: &mut impl DelayNs) {
        let byte_us = self.byte_time_us();
        while self.with_state(|state, regs| pump_tx(state, regs)) {
            delay.delay_us(byte_us);
        }
        while self.flags().contains(Flags::BUSY) {
            delay.delay_us(byte_us);
        }
    }
}

/// Push queued bytes into the FIFO. Returns whether bytes remain queued.
fn pump_tx(state: &mut State<'_>, regs: &impl Registers) -> bool {
    match state.tx.as_mut() {
        Some(tx) => {
            tx_queue_update(regs, tx);
            !tx.is_empty()
        }
        None => false,
    }
}

/// Shared retry loop of the timed transfers.
///
/// `attempt` gets the number of bytes done so far and moves more.
fn retry(
    len: usize,
    timeout_ms: u32,
    delay: &mut impl DelayNs,
    mut attempt: impl FnMut(usize) -> Result<usize, TransferError>,
) -> Result<usize, TransferError> {
    let mut done = 0;
    let mut spent = 0;
    while done < len && spent < timeout_ms {
        match attempt(done) {
            Ok(n) => done += n,
            Err(e) => return Err(TransferError::new(e.error, done + e.transferred)),
        }
        if done < len {
            delay.delay_ms(1);
            if timeout_ms != WAIT_FOREVER {
                spent += 1;
            }
        }
    }
    if done < len {
        debug!("transfer timed out after {} of {} bytes", done, len);
        return Err(TransferError::new(Error::Timeout, done));
    }
    Ok(done)
}

/// Move bytes from the receive FIFO into `rx`.
///
/// Reads no more than fits. Good bytes before a receive error are kept.
pub(super) fn rx_queue_update(regs: &impl Registers, rx: &mut Queue<'_>) -> Result<(), Error> {
    let mut chunk = [0; FIFO_DEPTH];
    let room = rx.space_left().min(FIFO_DEPTH);
    let read = fifo::read(regs, &mut chunk[..room]);
    let n = match read {
        Ok(n) => n,
        Err(e) => e.transferred,
    };
    rx.add(&chunk[..n])?;
    read.map_err(|e| e.error)?;

    if rx.is_full() && fifo::rx_ready(regs) {
        warn!("uart{}: receive queue full", regs.module());
        return Err(Error::RxQueueFull);
    }
    Ok(())
}

/// Move bytes from `tx` into the transmit FIFO until either runs out.
pub(super) fn tx_queue_update(regs: &impl Registers, tx: &mut Queue<'_>) {
    while fifo::tx_ready(regs) {
        let Some(byte) = tx.pop() else {
            break;
        };
        regs.write(Reg::Dr, byte.into());
    }
}
