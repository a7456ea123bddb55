//! Delivery state of the DSSS transmitter.

/// Where the transmitter is in the handshake of the current frame.
///
/// ```text
/// Idle -> Sending -> AwaitingAck -> Acked
///            ^             |
///            +-- Retry <---+-----> Failed
/// ```
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// No frame in flight.
    Idle,
    /// The frame is being written to the link.
    Sending,
    /// The frame is out, waiting for the acknowledgment byte.
    AwaitingAck,
    /// The last frame was acknowledged.
    Acked,
    /// The acknowledgment timed out or did not match, the frame goes out again.
    Retry,
    /// The last frame was given up, either after the retry ceiling or on a link error.
    Failed,
}

impl TxState {
    /// Returns `true` for [`TxState::Acked`] and [`TxState::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Acked | TxState::Failed)
    }
}

impl Default for TxState {
    fn default() -> Self {
        TxState::Idle
    }
}

/// Outcome of a single acknowledgment wait.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckStatus {
    /// The expected byte arrived.
    Received,
    /// Nothing arrived within the timeout.
    Timeout,
    /// A different byte arrived.
    Mismatch(u8),
}

impl From<Option<u8>> for AckStatus {
    fn from(reply: Option<u8>) -> Self {
        match reply {
            Some(crate::ACK_BYTE) => AckStatus::Received,
            Some(other) => AckStatus::Mismatch(other),
            None => AckStatus::Timeout,
        }
    }
}

/// Summary of a delivered frame.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxReport {
    pub(crate) attempts: u16,
    pub(crate) timeouts: u16,
    pub(crate) mismatches: u16,
}

impl TxReport {
    /// Number of times the frame was put on the wire, the acknowledged one included.
    pub fn attempts(&self) -> u16 {
        self.attempts
    }

    /// Number of attempts that ended in an acknowledgment timeout.
    pub fn timeouts(&self) -> u16 {
        self.timeouts
    }

    /// Number of attempts answered with a wrong byte.
    pub fn mismatches(&self) -> u16 {
        self.mismatches
    }
}
