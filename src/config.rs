//! Line configuration, clock selection and power states.

use crate::error::Error;
use crate::regs::{cr, ifls, lcrh};

/// Bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    /// 5 bits.
    Five,
    /// 6 bits.
    Six,
    /// 7 bits.
    Seven,
    /// 8 bits.
    Eight,
}

impl DataBits {
    pub(crate) const fn lcrh(self) -> u32 {
        (self as u32) << lcrh::WLEN_SHIFT
    }
}

/// Parity bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// No parity bit.
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

impl Parity {
    pub(crate) const fn lcrh(self) -> u32 {
        match self {
            Parity::None => 0,
            Parity::Odd => lcrh::PEN,
            Parity::Even => lcrh::PEN | lcrh::EPS,
        }
    }
}

/// Stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    /// One stop bit.
    One,
    /// Two stop bits.
    Two,
}

impl StopBits {
    pub(crate) const fn lcrh(self) -> u32 {
        match self {
            StopBits::One => 0,
            StopBits::Two => lcrh::STP2,
        }
    }
}

/// Hardware flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    /// No flow control.
    None,
    /// Transmit only while CTS is asserted.
    Cts,
    /// Drive RTS from the receive FIFO level.
    Rts,
    /// Both directions.
    RtsCts,
}

impl FlowControl {
    pub(crate) const fn cr(self) -> u32 {
        match self {
            FlowControl::None => 0,
            FlowControl::Cts => cr::CTSEN,
            FlowControl::Rts => cr::RTSEN,
            FlowControl::RtsCts => cr::CTSEN | cr::RTSEN,
        }
    }
}

/// FIFO fill level that triggers the TX or RX interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoLevel {
    /// 1/8 full.
    OneEighth,
    /// 1/4 full.
    OneQuarter,
    /// 1/2 full.
    Half,
    /// 3/4 full.
    ThreeQuarters,
    /// 7/8 full.
    SevenEighths,
}

impl FifoLevel {
    pub(crate) const fn ifls(tx: FifoLevel, rx: FifoLevel) -> u32 {
        ((tx as u32) << ifls::TXIFLSEL_SHIFT) | ((rx as u32) << ifls::RXIFLSEL_SHIFT)
    }
}

/// UART reference clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSpeed {
    /// The part's default, 24 MHz.
    #[default]
    Default,
    /// Clock gated off. The UART cannot run.
    NoClock,
    /// 24 MHz.
    Mhz24,
    /// 12 MHz.
    Mhz12,
    /// 6 MHz.
    Mhz6,
    /// 3 MHz.
    Mhz3,
}

impl ClockSpeed {
    /// Value of the CR clock select field.
    pub(crate) const fn clksel(self) -> u32 {
        match self {
            ClockSpeed::Default => ClockSpeed::Mhz24.clksel(),
            other => other as u32 - 1,
        }
    }

    /// Reference frequency in Hz for a CR clock select value.
    pub(crate) const fn frequency(clksel: u32) -> Option<u32> {
        match clksel {
            1 => Some(24_000_000),
            2 => Some(12_000_000),
            3 => Some(6_000_000),
            4 => Some(3_000_000),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ClockSpeed {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self, Error> {
        Ok(match raw {
            0 => ClockSpeed::Default,
            1 => ClockSpeed::NoClock,
            2 => ClockSpeed::Mhz24,
            3 => ClockSpeed::Mhz12,
            4 => ClockSpeed::Mhz6,
            5 => ClockSpeed::Mhz3,
            _ => return Err(Error::InvalidArgument),
        })
    }
}

/// Power transitions accepted by [`Uart::power_control`](crate::Uart::power_control).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Power up, optionally restoring saved registers.
    Wake,
    /// Power down for normal sleep.
    NormalSleep,
    /// Power down for deep sleep.
    DeepSleep,
}

/// Settings applied by [`Uart::configure`](crate::Uart::configure).
///
/// The buffers become the software transmit and receive queues. An absent or
/// empty buffer leaves that direction unqueued, moving bytes straight through
/// the hardware FIFO.
#[derive(Debug)]
pub struct Config<'a> {
    /// Requested baud rate. The achieved rate is reported by
    /// [`Uart::baudrate`](crate::Uart::baudrate).
    pub baudrate: u32,
    /// Bits per character.
    pub data_bits: DataBits,
    /// Parity bit.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Hardware flow control.
    pub flow_control: FlowControl,
    /// Transmit interrupt trigger level.
    pub tx_fifo_level: FifoLevel,
    /// Receive interrupt trigger level.
    pub rx_fifo_level: FifoLevel,
    /// Transmit queue memory.
    pub tx_buffer: Option<&'a mut [u8]>,
    /// Receive queue memory.
    pub rx_buffer: Option<&'a mut [u8]>,
}

impl Default for Config<'_> {
    /// 115200 8N1, no flow control, half-full trigger levels, no queues.
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            tx_fifo_level: FifoLevel::Half,
            rx_fifo_level: FifoLevel::Half,
            tx_buffer: None,
            rx_buffer: None,
        }
    }
}

impl Config<'_> {
    pub(crate) fn lcrh(&self) -> u32 {
        self.data_bits.lcrh() | self.parity.lcrh() | self.stop_bits.lcrh() | lcrh::FEN
    }
}
