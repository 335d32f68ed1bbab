//! Register-level UART model for host tests.

extern crate std;

use core::cell::RefCell;
use std::boxed::Box;
use std::collections::VecDeque;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::regs::{FIFO_DEPTH, Flags, Interrupt, Reg, Registers};

const REG_COUNT: usize = Reg::Iec.offset() / 4 + 1;

struct Model {
    regs: [u32; REG_COUNT],
    /// Received words, data byte plus error bits.
    rx: VecDeque<u32>,
    /// Bytes waiting in the transmit FIFO.
    tx: VecDeque<u8>,
    tx_capacity: usize,
    /// Bytes that left the transmitter.
    wire: Vec<u8>,
    /// Transmitter still shifting out the last byte.
    busy: bool,
    powered: bool,
    dr_reads: usize,
    dr_writes: usize,
}

/// A PL011-style UART with bounded FIFOs and interrupt status semantics.
///
/// Writes to IEC clear IES, MIS reads as `IES & IER`, and FR is derived from
/// the FIFO contents. Nothing is transmitted until the test says so.
pub(crate) struct MockUart {
    module: usize,
    model: RefCell<Model>,
}

impl MockUart {
    pub(crate) fn new(module: usize) -> Self {
        Self {
            module,
            model: RefCell::new(Model {
                regs: [0; REG_COUNT],
                rx: VecDeque::new(),
                tx: VecDeque::new(),
                tx_capacity: FIFO_DEPTH,
                wire: Vec::new(),
                busy: false,
                powered: true,
                dr_reads: 0,
                dr_writes: 0,
            }),
        }
    }

    pub(crate) fn push_rx(&self, data: &[u8]) {
        self.model
            .borrow_mut()
            .rx
            .extend(data.iter().map(|&b| u32::from(b)));
    }

    pub(crate) fn push_rx_word(&self, word: u32) {
        self.model.borrow_mut().rx.push_back(word);
    }

    pub(crate) fn rx_pending(&self) -> usize {
        self.model.borrow().rx.len()
    }

    /// Limit the transmit FIFO to `free` more bytes than it holds now.
    pub(crate) fn set_tx_free(&self, free: usize) {
        let mut m = self.model.borrow_mut();
        m.tx_capacity = m.tx.len() + free;
    }

    /// Remove the transmit FIFO bound.
    pub(crate) fn set_tx_unbounded(&self) {
        self.model.borrow_mut().tx_capacity = usize::MAX;
    }

    /// Bytes currently sitting in the transmit FIFO.
    pub(crate) fn tx_fifo(&self) -> Vec<u8> {
        self.model.borrow().tx.iter().copied().collect()
    }

    /// Shift up to `n` bytes out of the transmit FIFO onto the wire.
    ///
    /// Each byte frees its FIFO slot. The transmitter stays busy until
    /// [`MockUart::finish`].
    pub(crate) fn transmit(&self, n: usize) -> usize {
        let mut m = self.model.borrow_mut();
        let n = n.min(m.tx.len());
        let bytes: Vec<u8> = m.tx.drain(..n).collect();
        m.wire.extend(bytes);
        if n > 0 {
            m.busy = true;
        }
        n
    }

    /// Send everything and go idle.
    pub(crate) fn finish(&self) {
        self.transmit(usize::MAX);
        self.model.borrow_mut().busy = false;
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.model.borrow_mut().busy = busy;
    }

    pub(crate) fn wire(&self) -> Vec<u8> {
        self.model.borrow().wire.clone()
    }

    /// Latch interrupt sources in the raw status register.
    pub(crate) fn raise(&self, sources: Interrupt) {
        self.model.borrow_mut().regs[Reg::Ies.offset() / 4] |= sources.bits();
    }

    pub(crate) fn reg(&self, reg: Reg) -> u32 {
        self.model.borrow().regs[reg.offset() / 4]
    }

    pub(crate) fn set_reg(&self, reg: Reg, value: u32) {
        self.model.borrow_mut().regs[reg.offset() / 4] = value;
    }

    pub(crate) fn enabled(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.reg(Reg::Ier))
    }

    pub(crate) fn powered(&self) -> bool {
        self.model.borrow().powered
    }

    /// Data register reads and writes so far.
    pub(crate) fn dr_accesses(&self) -> (usize, usize) {
        let m = self.model.borrow();
        (m.dr_reads, m.dr_writes)
    }

    fn flags(m: &Model) -> Flags {
        let mut flags = Flags::empty();
        flags.set(Flags::RX_FIFO_EMPTY, m.rx.is_empty());
        flags.set(Flags::RX_FIFO_FULL, m.rx.len() >= FIFO_DEPTH);
        flags.set(Flags::TX_FIFO_EMPTY, m.tx.is_empty());
        flags.set(Flags::TX_FIFO_FULL, m.tx.len() >= m.tx_capacity);
        flags.set(Flags::BUSY, m.busy || !m.tx.is_empty());
        flags.set(Flags::TX_BUSY, m.busy || !m.tx.is_empty());
        flags
    }
}

impl Registers for MockUart {
    fn module(&self) -> usize {
        self.module
    }

    fn read(&self, reg: Reg) -> u32 {
        let mut m = self.model.borrow_mut();
        match reg {
            Reg::Dr => {
                m.dr_reads += 1;
                m.rx.pop_front().unwrap_or(0)
            }
            Reg::Fr => Self::flags(&m).bits(),
            Reg::Mis => m.regs[Reg::Ies.offset() / 4] & m.regs[Reg::Ier.offset() / 4],
            _ => m.regs[reg.offset() / 4],
        }
    }

    fn write(&self, reg: Reg, value: u32) {
        let mut m = self.model.borrow_mut();
        match reg {
            Reg::Dr => {
                m.dr_writes += 1;
                if m.tx.len() < m.tx_capacity {
                    m.tx.push_back(value as u8);
                }
            }
            Reg::Iec => m.regs[Reg::Ies.offset() / 4] &= !value,
            Reg::Fr | Reg::Ies | Reg::Mis => {}
            _ => m.regs[reg.offset() / 4] = value,
        }
    }

    fn set_power(&self, on: bool) {
        self.model.borrow_mut().powered = on;
    }
}

/// Delay that records how long it was asked to wait and can run a hook per call.
pub(crate) struct MockDelay<'m> {
    pub(crate) calls: usize,
    pub(crate) total_ns: u64,
    hook: Option<Box<dyn FnMut(usize) + 'm>>,
}

impl<'m> MockDelay<'m> {
    pub(crate) fn new() -> Self {
        Self {
            calls: 0,
            total_ns: 0,
            hook: None,
        }
    }

    /// Run `hook` with the 1-based call number on every delay.
    pub(crate) fn with(hook: impl FnMut(usize) + 'm) -> Self {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::new()
        }
    }
}

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ns += u64::from(ns);
        if let Some(hook) = self.hook.as_mut() {
            hook(self.calls);
        }
    }
}
