//! UART register block access.
//!
//! The driver only touches hardware through the [`Registers`] trait, so the
//! same code runs against memory-mapped registers on target ([`Mmio`]) and
//! against a model in host tests.

use core::ptr;

use bitflags::bitflags;

/// Depth of the transmit and receive hardware FIFOs, in bytes.
pub const FIFO_DEPTH: usize = 32;

/// Highest baud rate the block supports.
pub const MAX_BAUDRATE: u32 = 921_600;

/// Register offsets from the start of a UART block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Reg {
    /// Data register.
    Dr = 0x00,
    /// Receive status / error clear.
    Rsr = 0x04,
    /// Flag register.
    Fr = 0x18,
    /// IrDA low-power counter.
    Ilpr = 0x20,
    /// Integer baud rate divisor.
    Ibrd = 0x24,
    /// Fractional baud rate divisor.
    Fbrd = 0x28,
    /// Line control.
    Lcrh = 0x2C,
    /// Control.
    Cr = 0x30,
    /// FIFO interrupt level select.
    Ifls = 0x34,
    /// Interrupt enable.
    Ier = 0x38,
    /// Raw interrupt status.
    Ies = 0x3C,
    /// Masked interrupt status.
    Mis = 0x40,
    /// Interrupt clear.
    Iec = 0x44,
}

impl Reg {
    /// Byte offset of the register.
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Access to one UART register block.
pub trait Registers {
    /// Module index this block belongs to.
    fn module(&self) -> usize;

    /// Read a register.
    fn read(&self, reg: Reg) -> u32;

    /// Write a register.
    fn write(&self, reg: Reg, value: u32);

    /// Read-modify-write a register.
    ///
    /// Not atomic; callers that share a register with an interrupt handler
    /// wrap this in a critical section.
    fn modify(&self, reg: Reg, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Switch the power domain of the block on or off.
    fn set_power(&self, on: bool) {
        let _ = on;
    }
}

impl<T: Registers> Registers for &T {
    fn module(&self) -> usize {
        T::module(self)
    }

    fn read(&self, reg: Reg) -> u32 {
        T::read(self, reg)
    }

    fn write(&self, reg: Reg, value: u32) {
        T::write(self, reg, value)
    }

    fn set_power(&self, on: bool) {
        T::set_power(self, on)
    }
}

/// Apollo3 address map.
pub mod apollo3 {
    /// Base address of UART0.
    pub const UART0_BASE: usize = 0x4001_C000;
    /// Distance between consecutive UART blocks.
    pub const UART_STRIDE: usize = 0x1000;
    /// Number of UART modules.
    pub const UART_COUNT: usize = 2;
    /// PWRCTRL device power enable register.
    pub const PWRCTRL_DEVPWREN: usize = 0x4002_1008;
    /// Bit of UART0 in `PWRCTRL_DEVPWREN`; UART1 is the next bit up.
    pub const PWRENUART0: u32 = 7;
}

/// Memory-mapped register block.
#[derive(Debug)]
pub struct Mmio {
    module: usize,
    base: usize,
    /// Power enable register address and bit mask, if the part has one.
    power: Option<(usize, u32)>,
}

impl Mmio {
    /// Register block at `base` for UART `module`, without power control.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a PL011-compatible UART block, and no
    /// other code may drive that block while this value is in use.
    pub const unsafe fn new(module: usize, base: usize) -> Self {
        Self {
            module,
            base,
            power: None,
        }
    }

    /// UART `module` on an Apollo3, with its PWRCTRL power enable bit.
    ///
    /// # Safety
    ///
    /// Must run on an Apollo3 with `module < apollo3::UART_COUNT`, and no
    /// other code may drive that block while this value is in use.
    pub const unsafe fn apollo3(module: usize) -> Self {
        Self {
            module,
            base: apollo3::UART0_BASE + module * apollo3::UART_STRIDE,
            power: Some((
                apollo3::PWRCTRL_DEVPWREN,
                1 << (apollo3::PWRENUART0 + module as u32),
            )),
        }
    }

    fn word(address: usize) -> *mut u32 {
        ptr::with_exposed_provenance_mut(address)
    }
}

impl Registers for Mmio {
    fn module(&self) -> usize {
        self.module
    }

    fn read(&self, reg: Reg) -> u32 {
        // SAFETY: `new`/`apollo3` callers guarantee the block is mapped at `base`.
        unsafe { Self::word(self.base + reg.offset()).read_volatile() }
    }

    fn write(&self, reg: Reg, value: u32) {
        // SAFETY: `new`/`apollo3` callers guarantee the block is mapped at `base`.
        unsafe { Self::word(self.base + reg.offset()).write_volatile(value) }
    }

    fn set_power(&self, on: bool) {
        let Some((address, mask)) = self.power else {
            return;
        };
        let reg = Self::word(address);
        critical_section::with(|_| {
            // SAFETY: `apollo3` callers guarantee this is the PWRCTRL block, and the critical
            // section keeps the read-modify-write from racing other power requests.
            unsafe {
                let value = reg.read_volatile();
                reg.write_volatile(if on { value | mask } else { value & !mask });
            }
        });
    }
}

bitflags! {
    /// Flag register (FR) bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Clear to send.
        const CTS = 1 << 0;
        /// Data set ready.
        const DSR = 1 << 1;
        /// Data carrier detect.
        const DCD = 1 << 2;
        /// The UART is transmitting.
        const BUSY = 1 << 3;
        /// Receive FIFO empty.
        const RX_FIFO_EMPTY = 1 << 4;
        /// Transmit FIFO full.
        const TX_FIFO_FULL = 1 << 5;
        /// Receive FIFO full.
        const RX_FIFO_FULL = 1 << 6;
        /// Transmit FIFO empty.
        const TX_FIFO_EMPTY = 1 << 7;
        /// Transmitter busy.
        const TX_BUSY = 1 << 8;
    }
}

bitflags! {
    /// Interrupt sources, as laid out in IER, IES, MIS and IEC.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupt: u32 {
        /// Transmit complete.
        const TX_COMPLETE = 1 << 0;
        /// CTS modem line changed.
        const CTS = 1 << 1;
        /// DCD modem line changed.
        const DCD = 1 << 2;
        /// DSR modem line changed.
        const DSR = 1 << 3;
        /// Receive FIFO reached its trigger level.
        const RX = 1 << 4;
        /// Transmit FIFO drained to its trigger level.
        const TX = 1 << 5;
        /// Receive timeout with data left in the FIFO.
        const RX_TIMEOUT = 1 << 6;
        /// Framing error.
        const FRAMING = 1 << 7;
        /// Parity error.
        const PARITY = 1 << 8;
        /// Break error.
        const BREAK = 1 << 9;
        /// Overrun error.
        const OVERRUN = 1 << 10;
    }
}

bitflags! {
    /// Events reported by [`Uart::interrupt_queue_service`](crate::Uart::interrupt_queue_service).
    ///
    /// The error bits share their positions with the error bits of the data register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u32 {
        /// A received byte was dropped because the receive queue was full.
        const RX_QUEUE_FULL = 0x0001;
        /// New bytes were stored in the receive queue.
        const RX_DATA_AVAILABLE = 0x0002;
        /// The transmit queue was still full after the FIFO was refilled.
        const TX_QUEUE_FULL = 0x0004;
        /// The last queued byte has left the transmitter.
        const TX_COMPLETE = 0x0008;
        /// Transmission is in progress.
        const TX_BUSY = 0x0010;
        /// A received byte had a framing error.
        const FRAMING_ERROR = dr::FE;
        /// A received byte had a parity error.
        const PARITY_ERROR = dr::PE;
        /// A break condition was received.
        const BREAK_ERROR = dr::BE;
        /// The receive FIFO overran.
        const OVERRUN_ERROR = dr::OE;
    }
}

/// Data register fields.
pub mod dr {
    /// Data byte.
    pub const DATA: u32 = 0xFF;
    /// Framing error.
    pub const FE: u32 = 1 << 8;
    /// Parity error.
    pub const PE: u32 = 1 << 9;
    /// Break error.
    pub const BE: u32 = 1 << 10;
    /// Overrun error.
    pub const OE: u32 = 1 << 11;
    /// Every receive error bit.
    pub const ERRORS: u32 = FE | PE | BE | OE;
}

/// Control register fields.
pub mod cr {
    /// UART enable.
    pub const UARTEN: u32 = 1 << 0;
    /// SIR enable.
    pub const SIREN: u32 = 1 << 1;
    /// SIR low-power mode.
    pub const SIRLP: u32 = 1 << 2;
    /// Clock enable.
    pub const CLKEN: u32 = 1 << 3;
    /// Clock select position.
    pub const CLKSEL_SHIFT: u32 = 4;
    /// Clock select field.
    pub const CLKSEL_MASK: u32 = 0x7 << CLKSEL_SHIFT;
    /// Loopback enable.
    pub const LBE: u32 = 1 << 7;
    /// Transmit enable.
    pub const TXE: u32 = 1 << 8;
    /// Receive enable.
    pub const RXE: u32 = 1 << 9;
    /// Data transmit ready.
    pub const DTR: u32 = 1 << 10;
    /// Request to send.
    pub const RTS: u32 = 1 << 11;
    /// Out1 modem line.
    pub const OUT1: u32 = 1 << 12;
    /// Out2 modem line.
    pub const OUT2: u32 = 1 << 13;
    /// RTS hardware flow control.
    pub const RTSEN: u32 = 1 << 14;
    /// CTS hardware flow control.
    pub const CTSEN: u32 = 1 << 15;
}

/// Line control register fields.
pub mod lcrh {
    /// Send break.
    pub const BRK: u32 = 1 << 0;
    /// Parity enable.
    pub const PEN: u32 = 1 << 1;
    /// Even parity select.
    pub const EPS: u32 = 1 << 2;
    /// Two stop bits.
    pub const STP2: u32 = 1 << 3;
    /// FIFO enable.
    pub const FEN: u32 = 1 << 4;
    /// Word length position.
    pub const WLEN_SHIFT: u32 = 5;
    /// Word length field.
    pub const WLEN_MASK: u32 = 0x3 << WLEN_SHIFT;
    /// Stick parity select.
    pub const SPS: u32 = 1 << 7;
}

/// FIFO level select register fields.
pub mod ifls {
    /// Transmit trigger level position.
    pub const TXIFLSEL_SHIFT: u32 = 0;
    /// Transmit trigger level field.
    pub const TXIFLSEL_MASK: u32 = 0x7 << TXIFLSEL_SHIFT;
    /// Receive trigger level position.
    pub const RXIFLSEL_SHIFT: u32 = 3;
    /// Receive trigger level field.
    pub const RXIFLSEL_MASK: u32 = 0x7 << RXIFLSEL_SHIFT;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_error_bits_match_data_register() {
        let byte = 0x41 | dr::PE | dr::OE;
        let status = Status::from_bits_truncate(byte & dr::ERRORS);
        assert_eq!(status, Status::PARITY_ERROR | Status::OVERRUN_ERROR);
    }

    #[test]
    fn apollo3_map() {
        // SAFETY: Never dereferenced.
        let uart1 = unsafe { Mmio::apollo3(1) };
        assert_eq!(uart1.base, 0x4001_D000);
        assert_eq!(uart1.power, Some((0x4002_1008, 1 << 8)));
        assert_eq!(uart1.module(), 1);
    }
}
