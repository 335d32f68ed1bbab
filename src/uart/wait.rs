//! Futures woken by the interrupt service routines.

use core::future::poll_fn;
use core::task::Poll;

use super::Uart;
use crate::fifo;
use crate::queue::Queue;
use crate::regs::{Flags, Reg, Registers};

impl<'a, R: Registers> Uart<'a, R> {
    /// Waits until the receive queue holds data.
    ///
    /// Woken by the interrupt service routines. Without a receive queue this
    /// resolves as soon as the hardware FIFO has a byte, but nothing wakes it,
    /// so it then relies on the executor polling again.
    pub async fn wait_for_rx_data(&self) {
        poll_fn(|cx| {
            self.wakers.rx.register(cx.waker());

            let ready = self.with_state(|state, regs| match state.rx.as_ref() {
                Some(rx) => !rx.is_empty(),
                None => fifo::rx_ready(regs),
            });
            if ready { Poll::Ready(()) } else { Poll::Pending }
        })
        .await
    }

    /// Waits until nothing is queued for transmission and the transmitter is idle.
    ///
    /// Woken by [`Uart::interrupt_service`] when it sees the transmitter idle,
    /// and by [`Uart::interrupt_queue_service`] on TX complete.
    pub async fn wait_for_tx_idle(&self) {
        poll_fn(|cx| {
            self.wakers.tx.register(cx.waker());

            let idle = self.with_state(|state, regs| {
                state.tx.as_ref().is_none_or(Queue::is_empty)
                    && !Flags::from_bits_truncate(regs.read(Reg::Fr)).contains(Flags::BUSY)
            });
            if idle { Poll::Ready(()) } else { Poll::Pending }
        })
        .await
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Waker};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    use crate::Registry;
    use crate::mock::MockUart;
    use crate::regs::{Interrupt, Status};

    struct Counter(AtomicUsize);

    impl Wake for Counter {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn rx_future_woken_by_service() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let mut rx = [0; 8];
        let uart = registry.initialize(0, &mock).unwrap();
        uart.buffer_configure(None, Some(&mut rx));

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(uart.wait_for_rx_data());

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        mock.push_rx(b"!");
        mock.raise(Interrupt::RX);
        assert_eq!(uart.interrupt_queue_service(), Status::RX_DATA_AVAILABLE);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(fut.as_mut().poll(&mut cx).is_ready());
    }

    #[test]
    fn tx_future_woken_on_complete() {
        let registry = Registry::<1>::new();
        let mock = MockUart::new(0);
        let mut tx = [0; 8];
        let uart = registry.initialize(0, &mock).unwrap();
        uart.buffer_configure(Some(&mut tx), None);
        uart.append_tx(b"bye").unwrap();

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);
        let mut fut = pin!(uart.wait_for_tx_idle());

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        mock.finish();
        mock.raise(Interrupt::TX_COMPLETE);
        assert_eq!(uart.interrupt_queue_service(), Status::TX_COMPLETE);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(fut.as_mut().poll(&mut cx).is_ready());
    }
}
