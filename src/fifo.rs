//! Byte-at-a-time access to the hardware FIFOs.

use crate::error::{Error, TransferError};
use crate::regs::{Flags, Reg, Registers, dr};

fn flags(regs: &impl Registers) -> Flags {
    Flags::from_bits_truncate(regs.read(Reg::Fr))
}

/// True while the receive FIFO holds at least one byte.
pub(crate) fn rx_ready(regs: &impl Registers) -> bool {
    !flags(regs).contains(Flags::RX_FIFO_EMPTY)
}

/// True while the transmit FIFO can take another byte.
pub(crate) fn tx_ready(regs: &impl Registers) -> bool {
    !flags(regs).contains(Flags::TX_FIFO_FULL)
}

/// Read bytes until the receive FIFO is empty or `buf` is full.
///
/// A byte flagged with a receive error is consumed from the FIFO but not
/// stored. The error reports the good bytes read before it.
pub(crate) fn read(regs: &impl Registers, buf: &mut [u8]) -> Result<usize, TransferError> {
    let mut count = 0;
    for slot in buf.iter_mut() {
        if !rx_ready(regs) {
            break;
        }
        let word = regs.read(Reg::Dr);
        if word & dr::ERRORS != 0 {
            warn!("uart{}: receive error {=u32:#x}", regs.module(), word & dr::ERRORS);
            return Err(TransferError::new(Error::BusError, count));
        }
        *slot = (word & dr::DATA) as u8;
        count += 1;
    }
    Ok(count)
}

/// Write bytes until the transmit FIFO is full or `data` is exhausted.
pub(crate) fn write(regs: &impl Registers, data: &[u8]) -> usize {
    let mut count = 0;
    for &byte in data {
        if !tx_ready(regs) {
            break;
        }
        regs.write(Reg::Dr, byte.into());
        count += 1;
    }
    count
}
