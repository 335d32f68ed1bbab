//! Fire-and-forget transmit and opportunistic receive.

use super::Uart;
use super::service::arm_tx;
use super::transfer::{rx_queue_update, tx_queue_update};
use crate::error::{Error, TransferError};
use crate::fifo;
use crate::regs::{Interrupt, Reg, Registers};

impl<'a, R: Registers> Uart<'a, R> {
    /// Submit all of `data` for transmission.
    ///
    /// When the transmit queue is empty, bytes go straight into the hardware
    /// FIFO and only the overflow is queued. Otherwise the bytes are queued
    /// behind the existing ones and the FIFO is topped up from the queue.
    /// Afterwards TX is armed while bytes remain queued, TX complete once
    /// they do not. [`Uart::interrupt_queue_service`] takes it from there.
    ///
    /// Returns `data.len()`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`]: `data` is empty or no transmit queue is
    ///   attached.
    /// - [`Error::OutOfRange`]: the bytes left over after filling the FIFO do
    ///   not fit in the queue. None of them are queued. The bytes already in
    ///   the FIFO are sent regardless and reported in
    ///   [`TransferError::transferred`].
    pub fn append_tx(&self, data: &[u8]) -> Result<usize, TransferError> {
        if data.is_empty() {
            return Err(Error::InvalidArgument.into());
        }
        self.with_state(|state, regs| {
            let tx = state.tx.as_mut().ok_or(Error::InvalidArgument)?;
            regs.write(Reg::Iec, (Interrupt::TX_COMPLETE | Interrupt::TX).bits());

            let direct = tx.is_empty();
            let mut rest = data;
            if direct {
                rest = &rest[fifo::write(regs, rest)..];
            }

            let result = match tx.add(rest) {
                Ok(()) => Ok(data.len()),
                Err(_) => {
                    let sent = data.len() - rest.len();
                    warn!(
                        "uart{}: {} bytes do not fit the transmit queue",
                        regs.module(),
                        rest.len()
                    );
                    Err(TransferError::new(Error::OutOfRange, sent))
                }
            };

            if !direct {
                tx_queue_update(regs, tx);
            }
            arm_tx(regs, !tx.is_empty());
            result
        })
    }

    /// Copy up to `dest.len()` received bytes out of the receive queue.
    ///
    /// The receive FIFO is drained into the queue first. Receive errors met
    /// while draining are not reported here; the bytes before them are kept.
    /// Returns 0 when no receive queue is attached.
    ///
    /// # Errors
    ///
    /// [`Error::QueueInconsistent`] if the queue refuses to hand out bytes it
    /// claims to hold.
    pub fn get_rx_data(&self, dest: &mut [u8]) -> Result<usize, Error> {
        self.with_state(|state, regs| {
            let Some(rx) = state.rx.as_mut() else {
                return Ok(0);
            };
            let _ = rx_queue_update(regs, rx);
            let n = dest.len().min(rx.data_left());
            rx.get(&mut dest[..n])?;
            Ok(n)
        })
    }
}
