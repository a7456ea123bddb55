//! DSSS transmitter implementation.

use crate::config::LinkConfig;
use crate::error::TransferError;
use crate::frame::Frame;
use crate::pn::{PnSequence, PN_SEQUENCE};
use crate::status::{AckStatus, TxReport, TxState};
use crate::transport::Transport;
use crate::Signal;

/// The DSSS transmitter. Spreads a baseband signal, frames it and delivers it with an
/// acknowledgment handshake.
///
/// Every frame is sent as a whole and then the transmitter blocks for the acknowledgment
/// byte. If it does not arrive in time or has the wrong value, the whole frame goes out
/// again, up to the configured number of retries. There is no checksum: a single corrupted
/// chip looks exactly like a lost frame to the sender.
///
/// # Examples
/// ```
/// use spread_hop::config::LinkConfig;
/// use spread_hop::transport::Transport;
/// use spread_hop::{DsssTransmitter, ACK_BYTE, SIGNAL_LENGTH};
///
/// // A link that acknowledges every frame.
/// struct Loopback;
/// impl Transport for Loopback {
///     type Error = ();
///     fn send(&mut self, _: &[u8]) -> Result<(), ()> { Ok(()) }
///     fn receive(&mut self, _: u32) -> Result<Option<u8>, ()> { Ok(Some(ACK_BYTE)) }
/// }
///
/// let mut tx = DsssTransmitter::new(Loopback, LinkConfig::default());
/// let report = tx.transmit(&[0.5; SIGNAL_LENGTH]).unwrap();
/// assert_eq!(report.attempts(), 1);
/// ```
#[derive(Debug)]
pub struct DsssTransmitter<T> {
    link: T,
    pn: PnSequence,
    config: LinkConfig,
    state: TxState,
    // Outgoing frame, rebuilt per call to `transmit`
    frame: Frame,
}

impl<T, E> DsssTransmitter<T>
where
    T: Transport<Error = E>,
{
    /// Creates a new transmitter using the standard spreading code.
    pub fn new(link: T, config: LinkConfig) -> Self {
        Self::with_sequence(link, PN_SEQUENCE, config)
    }

    /// Creates a new transmitter with a custom spreading code.
    pub fn with_sequence(link: T, pn: PnSequence, config: LinkConfig) -> Self {
        DsssTransmitter {
            link,
            pn,
            config,
            state: TxState::Idle,
            frame: Frame::new(),
        }
    }

    /// Spreads `signal`, sends it and waits for the acknowledgment.
    ///
    /// Returns a [`TxReport`] once the frame is acknowledged.
    ///
    /// # Errors
    /// * [`TransferError::MaximumRetries`] when no valid acknowledgment arrived after
    ///   [`LinkConfig::max_attempts()`] attempts.
    /// * [`TransferError::Serial`] when the link itself fails, the frame is not retried.
    ///
    /// Both leave the transmitter in [`TxState::Failed`]. The frame was sent at least once
    /// when `MaximumRetries` is returned.
    pub fn transmit(&mut self, signal: &Signal) -> Result<TxReport, TransferError<E>> {
        self.state = TxState::Idle;
        self.frame.encode(signal, &self.pn);

        let mut report = TxReport {
            attempts: 0,
            timeouts: 0,
            mismatches: 0,
        };
        while report.attempts < self.config.max_attempts() {
            report.attempts += 1;
            match self.send_once()? {
                AckStatus::Received => {
                    self.state = TxState::Acked;
                    info!("acknowledgment received after {} attempt(s)", report.attempts);
                    return Ok(report);
                }
                AckStatus::Timeout => {
                    report.timeouts += 1;
                    warn!("no acknowledgment within {} ms, resending", self.config.ack_timeout_ms);
                }
                AckStatus::Mismatch(byte) => {
                    report.mismatches += 1;
                    warn!("unexpected acknowledgment byte {}, resending", byte);
                }
            }
            self.state = TxState::Retry;
        }

        self.state = TxState::Failed;
        error!("frame dropped after {} attempts", report.attempts);
        Err(TransferError::MaximumRetries {
            attempts: report.attempts,
        })
    }

    /// Current handshake state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// The last frame that was built.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Link configuration.
    pub fn config(&self) -> LinkConfig {
        self.config
    }

    /// Returns the link.
    pub fn release(self) -> T {
        self.link
    }

    // Puts the current frame on the wire once and waits for the reply.
    fn send_once(&mut self) -> Result<AckStatus, TransferError<E>> {
        self.state = TxState::Sending;
        if let Err(e) = self.link.send(self.frame.as_bytes()) {
            self.state = TxState::Failed;
            error!("link error while sending frame");
            return Err(TransferError::Serial(e));
        }
        debug!("signal transmitted");

        self.state = TxState::AwaitingAck;
        match self.link.receive(self.config.ack_timeout_ms) {
            Ok(reply) => Ok(AckStatus::from(reply)),
            Err(e) => {
                self.state = TxState::Failed;
                error!("link error while waiting for acknowledgment");
                Err(TransferError::Serial(e))
            }
        }
    }
}
