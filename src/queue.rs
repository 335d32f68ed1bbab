//! Fixed-capacity circular byte queue over caller-provided memory.

use crate::error::QueueError;

/// A circular byte queue.
///
/// All of `buf` is usable: a full queue holds `buf.len()` bytes. Bulk
/// operations are all-or-nothing and leave the queue unchanged on failure.
///
/// The queue itself is not synchronized. The driver only touches it inside
/// critical sections.
#[derive(Debug)]
pub struct Queue<'a> {
    buf: &'a mut [u8],
    /// Index of the oldest byte.
    read: usize,
    /// Index of the next free slot.
    write: usize,
    /// Number of stored bytes.
    len: usize,
}

impl<'a> Queue<'a> {
    /// An empty queue over `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            read: 0,
            write: 0,
            len: 0,
        }
    }

    /// Total number of bytes the queue can hold.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of stored bytes.
    pub fn data_left(&self) -> usize {
        self.len
    }

    /// Number of free bytes.
    pub fn space_left(&self) -> usize {
        self.capacity() - self.len
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when no byte can be added.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Drop all stored bytes.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }

    /// Append all of `data`, or nothing if it does not fit.
    pub fn add(&mut self, data: &[u8]) -> Result<(), QueueError> {
        if data.len() > self.space_left() {
            return Err(QueueError::NoSpace);
        }
        if data.is_empty() {
            return Ok(());
        }

        // First piece runs up to the end of the buffer, the rest wraps to the front.
        let first = data.len().min(self.capacity() - self.write);
        let (head, tail) = data.split_at(first);
        self.buf[self.write..self.write + first].copy_from_slice(head);
        self.buf[..tail.len()].copy_from_slice(tail);

        self.write = (self.write + data.len()) % self.capacity();
        self.len += data.len();
        Ok(())
    }

    /// Remove exactly `out.len()` bytes into `out`, or nothing if fewer are stored.
    pub fn get(&mut self, out: &mut [u8]) -> Result<(), QueueError> {
        if out.len() > self.len {
            return Err(QueueError::NotEnoughData);
        }
        if out.is_empty() {
            return Ok(());
        }

        let first = out.len().min(self.capacity() - self.read);
        let (head, tail) = out.split_at_mut(first);
        head.copy_from_slice(&self.buf[self.read..self.read + first]);
        tail.copy_from_slice(&self.buf[..tail.len()]);

        self.read = (self.read + out.len()) % self.capacity();
        self.len -= out.len();
        Ok(())
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::NoSpace);
        }
        self.buf[self.write] = byte;
        self.write = (self.write + 1) % self.capacity();
        self.len += 1;
        Ok(())
    }

    /// Remove the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.read];
        self.read = (self.read + 1) % self.capacity();
        self.len -= 1;
        Some(byte)
    }

    /// Oldest stored byte, without removing it.
    pub fn peek(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.buf[self.read])
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Deterministic xorshift32 so failures reproduce.
    struct Rng(u32);

    impl Rng {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }

        fn below(&mut self, n: usize) -> usize {
            self.next() as usize % n
        }
    }

    #[test]
    fn fill_and_drain() {
        let mut buf = [0; 4];
        let mut q = Queue::new(&mut buf);
        q.add(&[1, 2, 3, 4]).unwrap();
        assert!(q.is_full());
        assert_eq!(q.add(&[5]), Err(QueueError::NoSpace));

        let mut out = [0; 4];
        q.get(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn add_crossing_end() {
        let mut buf = [0; 5];
        let mut q = Queue::new(&mut buf);
        q.add(&[1, 2, 3]).unwrap();
        let mut out = [0; 3];
        q.get(&mut out).unwrap();

        // write index is 3, so this wraps after two bytes
        q.add(&[4, 5, 6, 7]).unwrap();
        assert_eq!(q.data_left(), 4);
        let mut out = [0; 4];
        q.get(&mut out).unwrap();
        assert_eq!(out, [4, 5, 6, 7]);
    }

    #[test]
    fn failed_add_leaves_state() {
        let mut buf = [0; 3];
        let mut q = Queue::new(&mut buf);
        q.add(&[9, 8]).unwrap();
        assert_eq!(q.add(&[1, 2]), Err(QueueError::NoSpace));
        assert_eq!(q.data_left(), 2);
        assert_eq!(q.pop(), Some(9));
        assert_eq!(q.pop(), Some(8));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn short_get_leaves_state() {
        let mut buf = [0; 8];
        let mut q = Queue::new(&mut buf);
        q.add(&[1, 2]).unwrap();
        let mut out = [0; 3];
        assert_eq!(q.get(&mut out), Err(QueueError::NotEnoughData));
        assert_eq!(out, [0; 3]);
        assert_eq!(q.peek(), Some(1));
        assert_eq!(q.data_left(), 2);
    }

    #[test]
    fn zero_capacity() {
        let mut buf: [u8; 0] = [];
        let mut q = Queue::new(&mut buf);
        assert!(q.is_empty());
        assert!(q.is_full());
        assert_eq!(q.add(&[]), Ok(()));
        assert_eq!(q.get(&mut []), Ok(()));
        assert_eq!(q.push(1), Err(QueueError::NoSpace));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn matches_model() {
        let mut rng = Rng(0x1234_5678);
        for capacity in [1, 2, 3, 7, 16, 33] {
            let mut buf = std::vec![0u8; capacity];
            let mut q = Queue::new(&mut buf);
            let mut model = VecDeque::new();

            for _ in 0..2000 {
                match rng.below(4) {
                    0 => {
                        let n = rng.below(capacity + 2);
                        let data: Vec<u8> = (0..n).map(|_| rng.next() as u8).collect();
                        let fits = n <= capacity - model.len();
                        assert_eq!(q.add(&data).is_ok(), fits);
                        if fits {
                            model.extend(data);
                        }
                    }
                    1 => {
                        let n = rng.below(capacity + 2);
                        let mut out = std::vec![0u8; n];
                        let enough = n <= model.len();
                        assert_eq!(q.get(&mut out).is_ok(), enough);
                        if enough {
                            let expected: Vec<u8> = model.drain(..n).collect();
                            assert_eq!(out, expected);
                        }
                    }
                    2 => {
                        let byte = rng.next() as u8;
                        let fits = model.len() < capacity;
                        assert_eq!(q.push(byte).is_ok(), fits);
                        if fits {
                            model.push_back(byte);
                        }
                    }
                    _ => assert_eq!(q.pop(), model.pop_front()),
                }
                assert_eq!(q.data_left(), model.len());
                assert_eq!(q.data_left() + q.space_left(), q.capacity());
            }
        }
    }
}
