/// Chip-level access to a whole port of pins, addressed by bitmask.
pub trait PortDriver {
    type Error;

    /// Number of pins the chip provides.  Pin `k` is bit `k` in all masks.
    const PINS: u8;

    /// Set all pins in `mask_high` to HIGH and all pins in `mask_low` to LOW.
    ///
    /// The driver should implement this such that all pins change state at the same time.
    fn set(&mut self, mask_high: u32, mask_low: u32) -> Result<(), Self::Error>;

    /// Check whether pins in `mask_high` are driven HIGH and pins in `mask_low` are driven LOW.
    ///
    /// For each pin in either of the masks, the returned `u32` should have a 1 if they meet the
    /// expected state and a 0 otherwise.  All other bits MUST always stay 0.
    fn get(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error>;
}

pub trait PortDriverTotemPole: PortDriver {
    /// Set the direction for all pins in `mask` to direction `dir`.
    ///
    /// To prevent electrical glitches, when making pins outputs, the `state` can be either `true`
    /// or `false` to immediately put the pin HIGH or LOW upon switching.
    fn set_direction(&mut self, mask: u32, dir: Direction, state: bool) -> Result<(), Self::Error>;
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

pub trait PortDriverInterrupts: PortDriver {
    /// Fetch the interrupt status of pins from the port expander.
    ///
    /// This method should fetch the interrupt information from the port expander and clear the
    /// remote interrupt condition.  The values need to be stored locally as part of the driver.
    ///
    /// The local values should be amended by new interrupt information instead of overwriting.
    fn fetch_interrupt_state(&mut self) -> Result<(), Self::Error>;

    /// Read whether pins changed state since the last interrupt.
    ///
    /// This method should only query the locally cached values that were retrieved by
    /// `fetch_interrupt_state()`, and reset the cached pin-change status for pins from the mask.
    fn query_pin_change(&mut self, mask: u32) -> u32;
}

/// Pin-change tracking for chips that signal "some input changed" without a status register.
///
/// The chip's input bits are compared against the last fetched value.  The very first fetch only
/// records the baseline.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ChangeTracker {
    last: Option<u32>,
    changed: u32,
}

impl ChangeTracker {
    pub(crate) fn update(&mut self, input: u32) {
        if let Some(last) = self.last {
            self.changed |= last ^ input;
        }
        self.last = Some(input);
    }

    pub(crate) fn take(&mut self, mask: u32) -> u32 {
        let hit = self.changed & mask;
        self.changed &= !mask;
        hit
    }
}
