use core::convert::Infallible;
use core::fmt;

/// Errors that can occur while delivering a DSSS frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError<SerialErr> {
    /// Serial link error
    Serial(SerialErr),
    /// No valid acknowledgment after the configured number of attempts
    MaximumRetries {
        /// Number of times the frame was put on the wire.
        attempts: u16,
    },
}

/// Reasons a frequency cannot be produced by the output timer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// A frequency of 0 Hz was requested.
    ZeroFrequency,
    /// The timer clock is too slow for the requested frequency.
    FrequencyTooHigh,
    /// Even the largest prescaler and period cannot go this low.
    FrequencyTooLow,
    /// The frequency, or what the output stage would actually produce for it, lies outside
    /// the configured hop band.
    OutOfBand,
    /// The closest achievable frequency misses the requested one by more than the tolerance.
    Imprecise,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroFrequency => f.write_str("zero frequency requested"),
            Self::FrequencyTooHigh => f.write_str("frequency above timer resolution"),
            Self::FrequencyTooLow => f.write_str("frequency below timer range"),
            Self::OutOfBand => f.write_str("frequency outside hop band"),
            Self::Imprecise => f.write_str("frequency beyond timer precision"),
        }
    }
}

/// Errors that can occur during a hop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HopError<TimerErr, SerialErr, PinErr> {
    /// The frequency cannot be produced, nothing was programmed.
    Unachievable(TimerError),
    /// Timer peripheral error
    Timer(TimerErr),
    /// Serial link error while reporting the frequency
    Serial(SerialErr),
    /// Status pin error
    Pin(PinErr),
}

impl<TimerErr, PinErr> HopError<TimerErr, Infallible, PinErr> {
    /// Widens an error raised without the serial link into one of a full hop.
    pub fn widen<SerialErr>(self) -> HopError<TimerErr, SerialErr, PinErr> {
        match self {
            Self::Unachievable(e) => HopError::Unachievable(e),
            Self::Timer(e) => HopError::Timer(e),
            Self::Serial(never) => match never {},
            Self::Pin(e) => HopError::Pin(e),
        }
    }
}

/// Invalid static configuration, detected before any hardware is touched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A PLL divider or multiplier lies outside its allowed range.
    PllOutOfRange,
    /// The resulting VCO or system clock exceeds the device limits.
    ClockTooFast,
    /// Baud rate of 0 or a divider that does not fit the register.
    InvalidBaudRate,
    /// The hop band is empty.
    EmptyBand,
    /// A band edge cannot be produced by the output timer.
    UnreachableBand(TimerError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PllOutOfRange => f.write_str("PLL factor out of range"),
            Self::ClockTooFast => f.write_str("clock exceeds device limit"),
            Self::InvalidBaudRate => f.write_str("invalid baud rate"),
            Self::EmptyBand => f.write_str("empty hop band"),
            Self::UnreachableBand(e) => write!(f, "hop band unreachable: {}", e),
        }
    }
}

/// Errors that can occur while bringing up the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpError<E> {
    /// Clock tree configuration failed
    Clock(E),
    /// GPIO configuration failed
    Gpio(E),
    /// UART configuration failed
    Uart(E),
    /// Timer configuration failed
    Timer(E),
    /// The configuration handed to bring-up is invalid
    Config(ConfigError),
}

impl<E> From<ConfigError> for BringUpError<E> {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
