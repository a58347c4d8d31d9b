//! The generic, consumer-facing GPIO pin device interface.
//!
//! A consumer opens a pin device through the [`GpioRegistry`][crate::GpioRegistry] and drives it
//! through [`GpioDevice`] without knowing what sits behind it.  [`PinAdapter`][crate::PinAdapter]
//! is the implementation for single I/O-expander pins.

/// What a pin device is used for.
///
/// The registry uses this to name the device; it does not configure the hardware.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PinType {
    Input = 0,
    InputPullUp = 1,
    InputPullDown = 2,
    Output = 3,
    OutputOpenDrain = 4,
    InterruptHigh = 5,
    InterruptLow = 6,
    InterruptRising = 7,
    InterruptFalling = 8,
    InterruptBoth = 9,
}

impl PinType {
    /// Number of pin types; raw values at or above this are invalid.
    pub const COUNT: u8 = 10;

    pub fn is_input(self) -> bool {
        matches!(
            self,
            PinType::Input | PinType::InputPullUp | PinType::InputPullDown
        )
    }

    pub fn is_output(self) -> bool {
        matches!(self, PinType::Output | PinType::OutputOpenDrain)
    }

    pub fn is_interrupt(self) -> bool {
        !self.is_input() && !self.is_output()
    }

    /// Device name prefix under `/dev`.
    pub fn prefix(self) -> &'static str {
        if self.is_input() {
            "gpin"
        } else if self.is_output() {
            "gpout"
        } else {
            "gpint"
        }
    }
}

/// A raw value that is not a known [`PinType`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPinType(pub u8);

impl TryFrom<u8> for PinType {
    type Error = InvalidPinType;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => PinType::Input,
            1 => PinType::InputPullUp,
            2 => PinType::InputPullDown,
            3 => PinType::Output,
            4 => PinType::OutputOpenDrain,
            5 => PinType::InterruptHigh,
            6 => PinType::InterruptLow,
            7 => PinType::InterruptRising,
            8 => PinType::InterruptFalling,
            9 => PinType::InterruptBoth,
            _ => return Err(InvalidPinType(raw)),
        })
    }
}

impl From<PinType> for u8 {
    fn from(t: PinType) -> u8 {
        t as u8
    }
}

/// Result of an interrupt callback, passed back unchanged to whoever dispatched it.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqStatus {
    Handled,
    NotHandled,
}

/// A single GPIO pin device.
///
/// `enable()` takes `&'a self` because arming the interrupt hands a reference to the device to
/// whoever delivers the interrupt.  Devices therefore live in storage that outlives `'a`.
pub trait GpioDevice<'a> {
    type Error;

    /// The pin type the device was created with.
    fn pin_type(&self) -> PinType;

    /// Read the current level of the pin.
    fn read(&self) -> Result<bool, Self::Error>;

    /// Drive the pin to `value`.
    fn write(&self, value: bool) -> Result<(), Self::Error>;

    /// Register (or with `None`, clear) the interrupt callback.
    ///
    /// Any armed interrupt is disarmed first, so the old callback is never invoked afterwards.
    fn attach(&self, callback: Option<&'a dyn PinCallback<'a, Self::Error>>)
        -> Result<(), Self::Error>;

    /// Arm (`true`) or disarm (`false`) interrupt delivery to the attached callback.
    fn enable(&'a self, enable: bool) -> Result<(), Self::Error>;
}

/// Consumer-side interrupt handler for a [`GpioDevice`].
///
/// Runs in whatever context the expander delivers interrupts from, possibly an interrupt handler.
pub trait PinCallback<'a, E> {
    /// The pin fired.  `gpio` is the device the callback was attached to.
    fn fired(&self, gpio: &'a dyn GpioDevice<'a, Error = E>) -> IrqStatus;
}
