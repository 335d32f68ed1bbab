//! The buffered UART driver.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::config::{ClockSpeed, Config, FifoLevel, PowerState};
use crate::error::Error;
use crate::queue::Queue;
use crate::regs::{Flags, Interrupt, MAX_BAUDRATE, Reg, Registers, cr};

mod append;
mod blocking;
mod service;
mod transfer;
#[cfg(feature = "async-await")]
mod wait;

pub use blocking::BlockingUart;
pub use transfer::{Direction, Transfer, WAIT_FOREVER};

/// UART clocks per bit.
const BAUD_CLOCKS: u64 = 16;

/// Registers saved across a power cycle, in restore order.
const RETAINED: [Reg; 7] = [
    Reg::Ilpr,
    Reg::Ibrd,
    Reg::Fbrd,
    Reg::Lcrh,
    Reg::Cr,
    Reg::Ifls,
    Reg::Ier,
];

/// Register values captured before sleep.
#[derive(Debug, Clone, Copy)]
struct Snapshot([u32; 7]);

impl Snapshot {
    fn save(regs: &impl Registers) -> Self {
        Self(RETAINED.map(|reg| regs.read(reg)))
    }

    fn restore(&self, regs: &impl Registers) {
        for (reg, value) in RETAINED.iter().zip(self.0) {
            regs.write(*reg, value);
        }
    }
}

/// Driver state shared between caller context and the interrupt handler.
pub(crate) struct State<'a> {
    pub(crate) tx: Option<Queue<'a>>,
    pub(crate) rx: Option<Queue<'a>>,
    baudrate: u32,
    clock: ClockSpeed,
    saved: Option<Snapshot>,
}

/// One claimed UART module.
///
/// Obtained from [`Registry::initialize`](crate::Registry::initialize). Every
/// method takes `&self`, so a single instance can be shared between thread
/// mode and the UART interrupt handler. State touched by both lives behind a
/// critical section.
///
/// Calling the transfer methods from two contexts at once is not supported.
/// The interrupt handler should only call [`Uart::interrupt_service`] or
/// [`Uart::interrupt_queue_service`].
pub struct Uart<'a, R: Registers> {
    regs: R,
    slot: &'a AtomicBool,
    state: Mutex<RefCell<State<'a>>>,
    #[cfg(feature = "async-await")]
    wakers: crate::waker::Wakers,
}

impl<'a, R: Registers> Uart<'a, R> {
    pub(crate) fn new(regs: R, slot: &'a AtomicBool) -> Self {
        Self {
            regs,
            slot,
            state: Mutex::new(RefCell::new(State {
                tx: None,
                rx: None,
                baudrate: 0,
                clock: ClockSpeed::Default,
                saved: None,
            })),
            #[cfg(feature = "async-await")]
            wakers: crate::waker::Wakers::new(),
        }
    }

    /// Run `f` on the shared state inside a critical section.
    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut State<'a>, &R) -> T) -> T {
        critical_section::with(|cs| f(&mut *self.state.borrow_ref_mut(cs), &self.regs))
    }

    /// Module index.
    pub fn module(&self) -> usize {
        self.regs.module()
    }

    /// The underlying register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Release the module so the registry can hand it out again.
    ///
    /// Equivalent to dropping the instance.
    pub fn deinitialize(self) {}

    /// Select the reference clock used by the next [`Uart::configure`].
    pub fn set_clock_speed(&self, clock: ClockSpeed) {
        self.with_state(|state, _| state.clock = clock);
    }

    /// The reference clock used by [`Uart::configure`].
    pub fn clock_speed(&self) -> ClockSpeed {
        self.with_state(|state, _| state.clock)
    }

    /// Move the module between power states.
    ///
    /// Going to sleep with `retain` saves the line, baud rate, FIFO level
    /// and interrupt enable registers. Waking with `retain` restores them.
    /// Going to sleep always clears pending interrupts and disables the UART.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] when waking with `retain` and nothing was saved.
    pub fn power_control(&self, power: PowerState, retain: bool) -> Result<(), Error> {
        match power {
            PowerState::Wake => {
                if retain && self.with_state(|state, _| state.saved.is_none()) {
                    return Err(Error::InvalidOperation);
                }
                self.regs.set_power(true);
                if retain {
                    self.with_state(|state, regs| {
                        if let Some(snapshot) = state.saved.take() {
                            snapshot.restore(regs);
                        }
                    });
                }
            }
            PowerState::NormalSleep | PowerState::DeepSleep => {
                if retain {
                    self.with_state(|state, regs| state.saved = Some(Snapshot::save(regs)));
                }
                self.regs.write(Reg::Iec, u32::MAX);
                self.regs.write(Reg::Cr, 0);
                self.regs.set_power(false);
            }
        }
        trace!("uart{}: power {}, retain {}", self.module(), power, retain);
        Ok(())
    }

    /// Apply `config` and attach its buffers as queues.
    ///
    /// The UART is disabled while its clock, baud rate, flow control, FIFO
    /// levels and line format are programmed, then enabled with FIFOs on.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockNotConfigured`]: the clock is [`ClockSpeed::NoClock`].
    /// - [`Error::BaudrateNotPossible`]: the rate is zero, above 921600, or
    ///   outside the divisor range of the clock.
    ///
    /// On error the UART stays disabled and [`Uart::baudrate`] reads 0.
    pub fn configure(&self, config: Config<'a>) -> Result<(), Error> {
        let regs = &self.regs;
        regs.write(Reg::Cr, 0);

        let clock = self.clock_speed();
        critical_section::with(|_| {
            regs.modify(Reg::Cr, |v| {
                (v & !cr::CLKSEL_MASK) | cr::CLKEN | (clock.clksel() << cr::CLKSEL_SHIFT)
            })
        });
        critical_section::with(|_| {
            regs.modify(Reg::Cr, |v| v & !(cr::UARTEN | cr::RXE | cr::TXE))
        });

        let baudrate = self.program_baudrate(config.baudrate);
        self.with_state(|state, _| state.baudrate = baudrate.unwrap_or(0));
        let baudrate = baudrate.inspect_err(|e| {
            warn!("uart{}: cannot run at {} baud: {}", self.module(), config.baudrate, e);
        })?;

        regs.modify(Reg::Cr, |v| {
            (v & !(cr::RTSEN | cr::CTSEN)) | config.flow_control.cr()
        });
        regs.write(
            Reg::Ifls,
            FifoLevel::ifls(config.tx_fifo_level, config.rx_fifo_level),
        );
        regs.write(Reg::Lcrh, config.lcrh());

        critical_section::with(|_| {
            regs.modify(Reg::Cr, |v| v | cr::UARTEN | cr::RXE | cr::TXE)
        });

        self.buffer_configure(config.tx_buffer, config.rx_buffer);
        debug!("uart{}: configured at {} baud", self.module(), baudrate);
        Ok(())
    }

    /// Program IBRD/FBRD for `baudrate` from the clock selected in CR.
    ///
    /// Returns the rate actually produced by the divisors.
    fn program_baudrate(&self, baudrate: u32) -> Result<u32, Error> {
        if baudrate > MAX_BAUDRATE {
            return Err(Error::BaudrateNotPossible);
        }
        let clksel = (self.regs.read(Reg::Cr) & cr::CLKSEL_MASK) >> cr::CLKSEL_SHIFT;
        let clock = ClockSpeed::frequency(clksel).ok_or(Error::ClockNotConfigured)?;
        let (integer, fraction) = divisors(clock, baudrate).ok_or(Error::BaudrateNotPossible)?;

        self.regs.write(Reg::Ibrd, integer);
        self.regs.write(Reg::Fbrd, fraction);

        Ok(clock / (BAUD_CLOCKS as u32 * integer + fraction / 4))
    }

    /// Attach transmit and receive queues.
    ///
    /// An absent or empty buffer detaches the queue for that direction.
    /// The TX interrupt is enabled when a transmit queue is attached, and the
    /// RX and RX timeout interrupts when a receive queue is. Any bytes still
    /// held by replaced queues are dropped.
    pub fn buffer_configure(&self, tx: Option<&'a mut [u8]>, rx: Option<&'a mut [u8]>) {
        let tx = tx.filter(|buf| !buf.is_empty()).map(Queue::new);
        let rx = rx.filter(|buf| !buf.is_empty()).map(Queue::new);
        self.with_state(|state, regs| {
            regs.modify(Reg::Ier, |v| {
                let mut enabled = Interrupt::from_bits_retain(v);
                enabled.set(Interrupt::TX, tx.is_some());
                enabled.set(Interrupt::RX | Interrupt::RX_TIMEOUT, rx.is_some());
                enabled.bits()
            });
            state.tx = tx;
            state.rx = rx;
        });
    }

    /// Baud rate achieved by the last [`Uart::configure`].
    pub fn baudrate(&self) -> u32 {
        self.with_state(|state, _| state.baudrate)
    }

    /// Current flag register.
    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(self.regs.read(Reg::Fr))
    }

    /// Enable interrupt sources.
    pub fn interrupt_enable(&self, sources: Interrupt) {
        critical_section::with(|_| self.regs.modify(Reg::Ier, |v| v | sources.bits()));
    }

    /// Disable interrupt sources.
    pub fn interrupt_disable(&self, sources: Interrupt) {
        critical_section::with(|_| self.regs.modify(Reg::Ier, |v| v & !sources.bits()));
    }

    /// Clear latched interrupt sources.
    pub fn interrupt_clear(&self, sources: Interrupt) {
        self.regs.write(Reg::Iec, sources.bits());
    }

    /// Latched interrupt sources, optionally masked by the enabled ones.
    pub fn interrupt_status(&self, enabled_only: bool) -> Interrupt {
        let reg = if enabled_only { Reg::Mis } else { Reg::Ies };
        Interrupt::from_bits_truncate(self.regs.read(reg))
    }

    /// Enabled interrupt sources.
    pub fn interrupt_enabled(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.regs.read(Reg::Ier))
    }

    /// Time for one character on the wire, in microseconds.
    fn byte_time_us(&self) -> u32 {
        match self.baudrate() {
            0 => 1000,
            baud => 12_000_000 / baud,
        }
    }
}

impl<R: Registers> Drop for Uart<'_, R> {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
        debug!("uart{}: released", self.regs.module());
    }
}

/// Integer and 6-bit fractional divisors for `baudrate` from a `clock` Hz reference.
fn divisors(clock: u32, baudrate: u32) -> Option<(u32, u32)> {
    let baud_clock = BAUD_CLOCKS * u64::from(baudrate);
    if baud_clock == 0 {
        return None;
    }
    let integer = u64::from(clock) / baud_clock;
    // IBRD is a 16-bit field.
    if integer == 0 || integer > 0xFFFF {
        return None;
    }
    let fraction = u64::from(clock) * 64 / baud_clock - integer * 64;
    Some((integer as u32, fraction as u32))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Registry;
    use crate::config::{DataBits, FlowControl, Parity};
    use crate::mock::MockUart;
    use crate::regs::lcrh;

    #[test]
    fn divisor_values() {
        assert_eq!(divisors(24_000_000, 115_200), Some((13, 1)));
        assert_eq!(divisors(24_000_000, 921_600), Some((1, 40)));
        assert_eq!(divisors(3_000_000, 921_600), None);
        assert_eq!(divisors(3_000_000, 0), None);
        assert_eq!(divisors(24_000_000, 10), None);
    }

    #[test]
    fn configure_programs_line() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let mut tx = [0; 16];
        let uart = registry.initialize(0, &mock).unwrap();

        uart.configure(Config {
            baudrate: 115_200,
            parity: Parity::Odd,
            flow_control: FlowControl::RtsCts,
            tx_buffer: Some(&mut tx),
            ..Config::default()
        })
        .unwrap();

        assert_eq!(uart.baudrate(), 115_384);
        assert_eq!(mock.reg(Reg::Ibrd), 13);
        assert_eq!(mock.reg(Reg::Fbrd), 1);
        assert_eq!(mock.reg(Reg::Ifls), 0x12);
        assert_eq!(
            mock.reg(Reg::Lcrh),
            DataBits::Eight.lcrh() | lcrh::PEN | lcrh::FEN
        );
        let cr = mock.reg(Reg::Cr);
        assert_eq!(cr & cr::CLKSEL_MASK, 1 << cr::CLKSEL_SHIFT);
        let on = cr::CLKEN | cr::UARTEN | cr::RXE | cr::TXE | cr::RTSEN | cr::CTSEN;
        assert_eq!(cr & on, on);
        assert_eq!(mock.enabled(), Interrupt::TX);
    }

    #[test]
    fn configure_rejects_rates() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let uart = registry.initialize(0, &mock).unwrap();

        let fast = Config {
            baudrate: 1_000_000,
            ..Config::default()
        };
        assert_eq!(uart.configure(fast), Err(Error::BaudrateNotPossible));
        assert_eq!(uart.baudrate(), 0);

        uart.set_clock_speed(ClockSpeed::NoClock);
        assert_eq!(
            uart.configure(Config::default()),
            Err(Error::ClockNotConfigured)
        );
        assert_eq!(mock.reg(Reg::Cr) & cr::UARTEN, 0);

        uart.set_clock_speed(ClockSpeed::Mhz3);
        uart.configure(Config::default()).unwrap();
        assert_eq!(uart.baudrate(), 3_000_000 / (16 + 40 / 4));
    }

    #[test]
    fn buffers_select_interrupts() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let mut tx: [u8; 0] = [];
        let mut rx = [0; 8];
        let uart = registry.initialize(0, &mock).unwrap();
        uart.interrupt_enable(Interrupt::TX | Interrupt::OVERRUN);

        uart.buffer_configure(Some(&mut tx), Some(&mut rx));
        assert_eq!(
            mock.enabled(),
            Interrupt::RX | Interrupt::RX_TIMEOUT | Interrupt::OVERRUN
        );
        uart.buffer_configure(None, None);
        assert_eq!(mock.enabled(), Interrupt::OVERRUN);
    }

    #[test]
    fn sleep_and_wake_with_retention() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let uart = registry.initialize(0, &mock).unwrap();

        assert_eq!(
            uart.power_control(PowerState::Wake, true),
            Err(Error::InvalidOperation)
        );

        uart.configure(Config::default()).unwrap();
        uart.interrupt_enable(Interrupt::RX);
        mock.raise(Interrupt::RX | Interrupt::TX);
        let cr = mock.reg(Reg::Cr);

        uart.power_control(PowerState::DeepSleep, true).unwrap();
        assert!(!mock.powered());
        assert_eq!(mock.reg(Reg::Cr), 0);
        assert_eq!(uart.interrupt_status(false), Interrupt::empty());

        // Registers lose their contents while the domain is off.
        mock.set_reg(Reg::Ibrd, 0);
        mock.set_reg(Reg::Ier, 0);

        uart.power_control(PowerState::Wake, true).unwrap();
        assert!(mock.powered());
        assert_eq!(mock.reg(Reg::Cr), cr);
        assert_eq!(mock.reg(Reg::Ibrd), 13);
        assert_eq!(uart.interrupt_enabled(), Interrupt::RX);

        // The snapshot is used up.
        assert_eq!(
            uart.power_control(PowerState::Wake, true),
            Err(Error::InvalidOperation)
        );
        uart.power_control(PowerState::NormalSleep, false).unwrap();
        uart.power_control(PowerState::Wake, false).unwrap();
    }

    #[test]
    fn interrupt_surface() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let uart = registry.initialize(0, &mock).unwrap();

        uart.interrupt_enable(Interrupt::RX | Interrupt::TX);
        uart.interrupt_disable(Interrupt::TX);
        assert_eq!(uart.interrupt_enabled(), Interrupt::RX);

        mock.raise(Interrupt::RX | Interrupt::FRAMING);
        assert_eq!(uart.interrupt_status(true), Interrupt::RX);
        assert_eq!(
            uart.interrupt_status(false),
            Interrupt::RX | Interrupt::FRAMING
        );
        uart.interrupt_clear(Interrupt::FRAMING);
        assert_eq!(uart.interrupt_status(false), Interrupt::RX);
    }
}
