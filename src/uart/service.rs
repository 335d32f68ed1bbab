//! Interrupt service routines.

use super::Uart;
use super::transfer::{rx_queue_update, tx_queue_update};
use crate::error::Error;
use crate::fifo;
use crate::queue::Queue;
use crate::regs::{Flags, Interrupt, Reg, Registers, Status, dr};

impl<'a, R: Registers> Uart<'a, R> {
    /// Service the interrupt sources in `status` using the queue helpers.
    ///
    /// RX or RX timeout drains the receive FIFO into the receive queue. TX
    /// refills the transmit FIFO from the transmit queue. Directions without a
    /// queue are left alone. The caller clears the interrupt sources.
    ///
    /// Returns whether the transmitter is idle: nothing queued and the UART
    /// not busy.
    ///
    /// # Errors
    ///
    /// [`Error::BusError`] or [`Error::RxQueueFull`] from the receive drain,
    /// in which case the transmit side is not serviced.
    pub fn interrupt_service(&self, status: Interrupt) -> Result<bool, Error> {
        let (idle, rx_data) = self.with_state(|state, regs| {
            if status.intersects(Interrupt::RX | Interrupt::RX_TIMEOUT) {
                if let Some(rx) = state.rx.as_mut() {
                    rx_queue_update(regs, rx)?;
                }
            }
            if status.contains(Interrupt::TX) {
                if let Some(tx) = state.tx.as_mut() {
                    tx_queue_update(regs, tx);
                }
            }
            let busy = Flags::from_bits_truncate(regs.read(Reg::Fr)).contains(Flags::BUSY);
            let idle = state.tx.as_ref().is_none_or(Queue::is_empty) && !busy;
            let rx_data = state.rx.as_ref().is_some_and(|rx| !rx.is_empty());
            Ok::<_, Error>((idle, rx_data))
        })?;

        #[cfg(feature = "async-await")]
        {
            if rx_data {
                self.wakers.rx.wake();
            }
            if idle {
                self.wakers.tx.wake();
            }
        }
        #[cfg(not(feature = "async-await"))]
        let _ = rx_data;

        Ok(idle)
    }

    /// Service whatever the masked interrupt status reports.
    ///
    /// - RX / RX timeout: every byte in the receive FIFO moves to the receive
    ///   queue, collecting receive error bits. A byte that does not fit is
    ///   dropped and [`Status::RX_QUEUE_FULL`] set. Both sources are cleared.
    /// - TX: the FIFO is refilled from the transmit queue. Once the queue is
    ///   empty, TX is disarmed and TX complete armed instead. A queue that is
    ///   still full afterwards is reported as [`Status::TX_QUEUE_FULL`].
    /// - TX complete: disarmed and reported as [`Status::TX_COMPLETE`].
    ///
    /// Never fails. Everything worth knowing is in the returned [`Status`].
    pub fn interrupt_queue_service(&self) -> Status {
        let regs = &self.regs;
        let mut status = Status::empty();

        if self.pending().intersects(Interrupt::RX | Interrupt::RX_TIMEOUT) {
            status |= self.with_state(|state, regs| drain_rx(state.rx.as_mut(), regs));
            regs.write(Reg::Iec, (Interrupt::RX_TIMEOUT | Interrupt::RX).bits());
        }

        if self.pending().contains(Interrupt::TX) {
            status |= self.with_state(|state, regs| match state.tx.as_mut() {
                Some(tx) if !tx.is_empty() => {
                    regs.write(Reg::Iec, (Interrupt::TX_COMPLETE | Interrupt::TX).bits());
                    tx_queue_update(regs, tx);
                    arm_tx(regs, !tx.is_empty());
                    if tx.is_full() {
                        Status::TX_BUSY | Status::TX_QUEUE_FULL
                    } else {
                        Status::TX_BUSY
                    }
                }
                _ => {
                    regs.write(Reg::Iec, Interrupt::TX.bits());
                    regs.modify(Reg::Ier, |v| v & !Interrupt::TX.bits());
                    Status::empty()
                }
            });
        }

        if self.pending().contains(Interrupt::TX_COMPLETE) {
            regs.write(Reg::Iec, Interrupt::TX_COMPLETE.bits());
            self.interrupt_disable(Interrupt::TX_COMPLETE);
            status.remove(Status::TX_BUSY);
            status |= Status::TX_COMPLETE;
        }

        if status.intersects(Status::RX_QUEUE_FULL) {
            warn!("uart{}: receive queue overflow", self.module());
        }

        #[cfg(feature = "async-await")]
        {
            if status.contains(Status::RX_DATA_AVAILABLE) {
                self.wakers.rx.wake();
            }
            if status.contains(Status::TX_COMPLETE) {
                self.wakers.tx.wake();
            }
        }

        status
    }

    fn pending(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.regs.read(Reg::Mis))
    }
}

/// Move the receive FIFO into `rx`, a missing queue holding nothing.
fn drain_rx(mut rx: Option<&mut Queue<'_>>, regs: &impl Registers) -> Status {
    let mut status = Status::empty();
    let before = rx.as_ref().map_or(0, |rx| rx.data_left());
    while fifo::rx_ready(regs) {
        let word = regs.read(Reg::Dr);
        status |= Status::from_bits_truncate(word & dr::ERRORS);
        let stored = rx
            .as_mut()
            .is_some_and(|rx| rx.push((word & dr::DATA) as u8).is_ok());
        if !stored {
            status |= Status::RX_QUEUE_FULL;
            break;
        }
    }
    if rx.as_ref().map_or(0, |rx| rx.data_left()) != before {
        status |= Status::RX_DATA_AVAILABLE;
    }
    status
}

/// Arm TX while bytes are queued, otherwise TX complete.
pub(super) fn arm_tx(regs: &impl Registers, queued: bool) {
    let (on, off) = if queued {
        (Interrupt::TX, Interrupt::TX_COMPLETE)
    } else {
        (Interrupt::TX_COMPLETE, Interrupt::TX)
    };
    regs.modify(Reg::Ier, |v| (v & !off.bits()) | on.bits());
}
