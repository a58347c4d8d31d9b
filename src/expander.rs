//! The provider-facing interface: an I/O expander addressed by pin index or pin-set.

use crate::IrqStatus;

/// A set of expander pins.  Bit `k` denotes pin `k`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PinSet(u32);

impl PinSet {
    pub const EMPTY: PinSet = PinSet(0);

    /// The set containing only `pin`.
    ///
    /// Panics if `pin` does not fit into a pin-set.
    pub const fn single(pin: u8) -> Self {
        assert!(pin < 32);
        PinSet(1 << pin)
    }

    pub const fn from_bits(bits: u32) -> Self {
        PinSet(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, pin: u8) -> bool {
        pin < 32 && self.0 & (1 << pin) != 0
    }
}

impl core::ops::BitAnd for PinSet {
    type Output = PinSet;

    fn bitand(self, rhs: PinSet) -> PinSet {
        PinSet(self.0 & rhs.0)
    }
}

impl core::ops::BitOr for PinSet {
    type Output = PinSet;

    fn bitor(self, rhs: PinSet) -> PinSet {
        PinSet(self.0 | rhs.0)
    }
}

/// Receiver of pin-set interrupts from an [`IoExpander`].
pub trait PinSetHandler<'a> {
    /// Pins in `pinset` raised an interrupt.  The return value is reported back to the expander.
    fn on_interrupt(&'a self, pinset: PinSet) -> IrqStatus;
}

/// An I/O expander: many pins behind one controller.
///
/// Implementations must serialize `attach()`/`detach()` against their own interrupt dispatch, and
/// must not invoke a handler after `detach()` for its handle has returned.  A dispatch that was
/// already running when `detach()` was called may still complete.
///
/// Callers hold their own lock across `attach()` and `detach()`, and handlers take that same lock.
/// So implementations must not call a handler synchronously from within `attach()` or `detach()`,
/// and must not hold their own lock while a handler runs.
pub trait IoExpander<'a> {
    type Error;

    /// Opaque token for one interrupt subscription.
    type Handle: Copy + core::fmt::Debug;

    /// Number of pins; valid pin indices are `0..pin_count()`.
    fn pin_count(&self) -> u8;

    fn read_pin(&self, pin: u8) -> Result<bool, Self::Error>;

    fn write_pin(&self, pin: u8, value: bool) -> Result<(), Self::Error>;

    /// Subscribe `handler` to interrupts on any pin in `pinset`.
    ///
    /// Returns `None` if no subscription could be allocated.
    fn attach(&self, pinset: PinSet, handler: &'a dyn PinSetHandler<'a>) -> Option<Self::Handle>;

    /// Cancel a subscription.  Passing a handle that was already detached is an error at best.
    fn detach(&self, handle: Self::Handle) -> Result<(), Self::Error>;
}
