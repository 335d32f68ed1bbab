//! Blocking byte-stream adaptor.

use core::fmt;

use embedded_hal::delay::DelayNs;

use super::Uart;
use crate::error::Error;
use crate::fifo;
use crate::regs::Registers;

/// [`embedded_io`] and [`core::fmt::Write`] on top of a [`Uart`].
///
/// Reads block until at least one byte is available, writes until at least
/// one byte is accepted, polling once per millisecond with the provided delay.
///
/// A receive error met after some good bytes were read is held back: those
/// bytes are returned first and the error is reported by the next read.
pub struct BlockingUart<'u, 'a, R: Registers, D: DelayNs> {
    uart: &'u Uart<'a, R>,
    delay: D,
    /// Receive error to report on the next read.
    pending: Option<Error>,
}

impl<'a, R: Registers> Uart<'a, R> {
    /// Borrow this UART as a blocking byte stream.
    pub fn blocking<D: DelayNs>(&self, delay: D) -> BlockingUart<'_, 'a, R, D> {
        BlockingUart {
            uart: self,
            delay,
            pending: None,
        }
    }
}

impl<R: Registers, D: DelayNs> BlockingUart<'_, '_, R, D> {
    /// Give back the delay.
    pub fn release(self) -> D {
        self.delay
    }
}

impl<R: Registers, D: DelayNs> embedded_io::ErrorType for BlockingUart<'_, '_, R, D> {
    type Error = Error;
}

impl<R: Registers, D: DelayNs> embedded_io::Read for BlockingUart<'_, '_, R, D> {
    /// A receive error that follows good bytes is reported by the next call,
    /// after those bytes have been returned.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if let Some(error) = self.pending.take() {
            return Err(error);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.uart.read_nonblocking(buf) {
                Ok(0) => self.delay.delay_ms(1),
                Ok(n) => return Ok(n),
                Err(e) if e.transferred > 0 => {
                    self.pending = Some(e.error);
                    return Ok(e.transferred);
                }
                Err(e) => return Err(e.error),
            }
        }
    }
}

impl<R: Registers, D: DelayNs> embedded_io::ReadReady for BlockingUart<'_, '_, R, D> {
    fn read_ready(&mut self) -> Result<bool, Error> {
        Ok(self.uart.with_state(|state, regs| match state.rx.as_ref() {
            Some(rx) => !rx.is_empty() || fifo::rx_ready(regs),
            None => fifo::rx_ready(regs),
        }))
    }
}

impl<R: Registers, D: DelayNs> embedded_io::Write for BlockingUart<'_, '_, R, D> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.uart.write_nonblocking(buf) {
                Ok(0) => self.delay.delay_ms(1),
                Ok(n) => return Ok(n),
                Err(e) => return Err(e.error),
            }
        }
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.uart.tx_flush(&mut self.delay);
        Ok(())
    }
}

impl<R: Registers, D: DelayNs> embedded_io::WriteReady for BlockingUart<'_, '_, R, D> {
    fn write_ready(&mut self) -> Result<bool, Error> {
        Ok(self.uart.with_state(|state, regs| match state.tx.as_ref() {
            Some(tx) => !tx.is_full(),
            None => fifo::tx_ready(regs),
        }))
    }
}

impl<R: Registers, D: DelayNs> fmt::Write for BlockingUart<'_, '_, R, D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        embedded_io::Write::write_all(self, s.as_bytes()).map_err(|_| fmt::Error)
    }
}
