//! Byte oriented link between the radio primitives and the outside world.
//!
//! Both the transmitter and the hopper talk through a [`Transport`]. On hardware this is a
//! UART, wrapped by [`SerialTransport`]. When both components share one UART, give each of
//! them a [`SharedTransport`] handle so only one of them can use it at a time.

use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

/// Blocking byte link with a receive timeout.
pub trait Transport {
    /// Link error type.
    type Error;

    /// Sends all of `bytes`, returns once they are handed to the hardware.
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Waits up to `timeout_ms` for a single byte.
    ///
    /// Returns `Ok(None)` when the timeout elapsed without data.
    fn receive(&mut self, timeout_ms: u32) -> Result<Option<u8>, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        T::send(self, bytes)
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<Option<u8>, Self::Error> {
        T::receive(self, timeout_ms)
    }
}

/// [`Transport`] over an [`embedded-io`](embedded_io) serial port.
///
/// The port has no notion of timeouts, so [`receive()`](Transport::receive) polls
/// [`ReadReady::read_ready()`] every [`SerialTransport::POLL_INTERVAL_US`] microseconds until
/// a byte shows up or the timeout is used up.
///
/// # Examples
/// ```ignore
/// let uart = Uart::new(dp.USART2, (tx, rx), 9600.bps(), &clocks)?;
/// let mut link = SerialTransport::new(uart, delay);
/// link.send(&[0xAA])?;
/// let ack = link.receive(1000)?;
/// ```
#[derive(Debug)]
pub struct SerialTransport<S, D> {
    serial: S,
    delay: D,
}

impl<S, D> SerialTransport<S, D>
where
    S: Read + ReadReady + Write,
    D: DelayNs,
{
    /// Time between two polls of the receive buffer.
    pub const POLL_INTERVAL_US: u32 = 100;

    /// Creates a new transport from a configured serial port and a delay source.
    pub fn new(serial: S, delay: D) -> Self {
        SerialTransport { serial, delay }
    }

    /// Returns the serial port and delay.
    pub fn release(self) -> (S, D) {
        (self.serial, self.delay)
    }
}

impl<S, D> Transport for SerialTransport<S, D>
where
    S: Read + ReadReady + Write,
    D: DelayNs,
{
    type Error = S::Error;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.serial.write_all(bytes)?;
        self.serial.flush()
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<Option<u8>, Self::Error> {
        let budget_us = u64::from(timeout_ms) * 1000;
        let mut waited_us = 0u64;
        loop {
            if self.serial.read_ready()? {
                let mut byte = [0u8];
                if self.serial.read(&mut byte)? == 1 {
                    return Ok(Some(byte[0]));
                }
            }
            if waited_us >= budget_us {
                return Ok(None);
            }
            self.delay.delay_us(Self::POLL_INTERVAL_US);
            waited_us += u64::from(Self::POLL_INTERVAL_US);
        }
    }
}

/// Errors of a [`SharedTransport`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SharedError<E> {
    /// Another handle is using the link right now.
    Busy,
    /// Error of the underlying link
    Link(E),
}

/// Handle to a [`Transport`] that is shared between several users.
///
/// Every call takes exclusive access to the link for its duration, so frames of different
/// users never interleave.
#[derive(Debug)]
pub struct SharedTransport<'a, T> {
    link: &'a RefCell<T>,
}

impl<'a, T: Transport> SharedTransport<'a, T> {
    /// Creates a new handle.
    pub fn new(link: &'a RefCell<T>) -> Self {
        SharedTransport { link }
    }
}

impl<T: Transport> Transport for SharedTransport<'_, T> {
    type Error = SharedError<T::Error>;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.link
            .try_borrow_mut()
            .map_err(|_| SharedError::Busy)?
            .send(bytes)
            .map_err(SharedError::Link)
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<Option<u8>, Self::Error> {
        self.link
            .try_borrow_mut()
            .map_err(|_| SharedError::Busy)?
            .receive(timeout_ms)
            .map_err(SharedError::Link)
    }
}
