//! Error types shared by every layer of the driver.

use core::fmt;

/// Failure kinds reported by the UART driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The register block does not belong to the requested module.
    InvalidHandle,
    /// An argument was empty, missing or out of its valid domain.
    InvalidArgument,
    /// The request is not valid in the current state.
    InvalidOperation,
    /// A module index or byte count exceeds what the instance can hold.
    OutOfRange,
    /// The timeout expired before the request completed.
    Timeout,
    /// A received byte carried a framing, parity, break or overrun error.
    BusError,
    /// The receive queue had no room for data waiting in the hardware FIFO.
    RxQueueFull,
    /// No usable UART clock is selected.
    ClockNotConfigured,
    /// The requested baud rate cannot be derived from the selected clock.
    BaudrateNotPossible,
    /// A queue refused an operation its own occupancy said would fit.
    QueueInconsistent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidHandle => "register block does not match the module",
            Error::InvalidArgument => "invalid argument",
            Error::InvalidOperation => "invalid operation",
            Error::OutOfRange => "out of range",
            Error::Timeout => "timed out",
            Error::BusError => "receive error on the bus",
            Error::RxQueueFull => "receive queue full",
            Error::ClockNotConfigured => "uart clock not configured",
            Error::BaudrateNotPossible => "baud rate not possible",
            Error::QueueInconsistent => "queue state inconsistent",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            Error::InvalidArgument => ErrorKind::InvalidInput,
            Error::InvalidOperation => ErrorKind::Unsupported,
            Error::OutOfRange | Error::RxQueueFull => ErrorKind::OutOfMemory,
            Error::Timeout => ErrorKind::TimedOut,
            Error::BusError => ErrorKind::InvalidData,
            _ => ErrorKind::Other,
        }
    }
}

/// A byte-moving operation that failed part way.
///
/// `transferred` is the number of bytes that were moved before the failure.
/// Those bytes have been consumed from (or delivered to) the caller's buffer
/// and are not moved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferError {
    /// What went wrong.
    pub error: Error,
    /// Bytes moved before the failure.
    pub transferred: usize,
}

impl TransferError {
    pub(crate) const fn new(error: Error, transferred: usize) -> Self {
        Self { error, transferred }
    }
}

impl From<Error> for TransferError {
    fn from(error: Error) -> Self {
        Self::new(error, 0)
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} bytes", self.error, self.transferred)
    }
}

impl core::error::Error for TransferError {}

impl embedded_io::Error for TransferError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::Error::kind(&self.error)
    }
}

/// Failure of an all-or-nothing [`Queue`](crate::Queue) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// The data does not fit in the free space.
    NoSpace,
    /// Fewer bytes are stored than were requested.
    NotEnoughData,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::NoSpace => f.write_str("not enough free space in queue"),
            QueueError::NotEnoughData => f.write_str("not enough data in queue"),
        }
    }
}

impl core::error::Error for QueueError {}

impl From<QueueError> for Error {
    fn from(_: QueueError) -> Self {
        Error::QueueInconsistent
    }
}
