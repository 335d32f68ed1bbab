//! Ownership of UART modules.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::Uart;
use crate::error::Error;
use crate::regs::Registers;

/// Hands out at most one [`Uart`] per module index.
///
/// Usually placed in a `static`:
///
/// ```
/// use apollo_uart::Registry;
///
/// static UARTS: Registry<2> = Registry::new();
/// assert!(!UARTS.is_initialized(0));
/// ```
pub struct Registry<const N: usize> {
    claimed: [AtomicBool; N],
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registry<N> {
    /// A registry with every module free.
    pub const fn new() -> Self {
        Self {
            claimed: [const { AtomicBool::new(false) }; N],
        }
    }

    /// Claim `module` and wrap its register block in a [`Uart`].
    ///
    /// The module is released again when the returned [`Uart`] is dropped or
    /// passed to [`Uart::deinitialize`].
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfRange`]: `module` is not below `N`.
    /// - [`Error::InvalidHandle`]: `regs` belongs to a different module.
    /// - [`Error::InvalidOperation`]: `module` is already claimed.
    pub fn initialize<R: Registers>(&self, module: usize, regs: R) -> Result<Uart<'_, R>, Error> {
        let slot = self.claimed.get(module).ok_or(Error::OutOfRange)?;
        if regs.module() != module {
            return Err(Error::InvalidHandle);
        }

        // Load and store instead of a swap, thumbv6m has no compare-and-swap.
        let free = critical_section::with(|_| {
            let free = !slot.load(Ordering::Acquire);
            if free {
                slot.store(true, Ordering::Release);
            }
            free
        });
        if !free {
            return Err(Error::InvalidOperation);
        }

        debug!("uart{}: initialized", module);
        Ok(Uart::new(regs, slot))
    }

    /// Whether `module` is currently claimed.
    pub fn is_initialized(&self, module: usize) -> bool {
        self.claimed
            .get(module)
            .is_some_and(|slot| slot.load(Ordering::Acquire))
    }
}
