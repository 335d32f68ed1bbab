//! Waker slots shared between the interrupt service routines and waiting futures.

use core::cell::RefCell;
use core::task::Waker;

use critical_section::Mutex;

/// Holds the waker of the one future waiting on an event.
pub(crate) struct WakerSlot {
    waker: Mutex<RefCell<Option<Waker>>>,
}

impl WakerSlot {
    pub(crate) const fn new() -> Self {
        Self {
            waker: Mutex::new(RefCell::new(None)),
        }
    }

    /// Store `waker`, replacing a different one.
    pub(crate) fn register(&self, waker: &Waker) {
        critical_section::with(|cs| {
            let mut slot = self.waker.borrow_ref_mut(cs);
            match slot.as_ref() {
                Some(old) if old.will_wake(waker) => {}
                _ => *slot = Some(waker.clone()),
            }
        });
    }

    /// Wake and forget the stored waker, if any.
    pub(crate) fn wake(&self) {
        if let Some(w) = critical_section::with(|cs| self.waker.borrow_ref_mut(cs).take()) {
            w.wake();
        }
    }
}

/// One slot per direction.
pub(crate) struct Wakers {
    pub(crate) rx: WakerSlot,
    pub(crate) tx: WakerSlot,
}

impl Wakers {
    pub(crate) const fn new() -> Self {
        Self {
            rx: WakerSlot::new(),
            tx: WakerSlot::new(),
        }
    }
}
