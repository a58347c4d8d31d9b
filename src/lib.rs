//! Single I/O-expander pins as standalone GPIO devices.
//!
//! [`PinAdapter`] wraps one pin of an [`IoExpander`] and implements [`GpioDevice`] on top of it,
//! including interrupt delivery through the expander's pin-set subscriptions.  [`PortExpander`]
//! is an [`IoExpander`] for the chip drivers in [`dev`], and [`PinRegistry`] names the resulting
//! devices.
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

mod bus;
mod common;
pub mod dev;
mod expander;
mod gpio;
mod lower_half;
mod mutex;
mod port;
mod registry;

#[cfg(test)]
mod testing;

pub use bus::I2cBus;
pub use common::{Direction, PortDriver, PortDriverInterrupts, PortDriverTotemPole};
pub use expander::{IoExpander, PinSet, PinSetHandler};
pub use gpio::{GpioDevice, InvalidPinType, IrqStatus, PinCallback, PinType};
pub use lower_half::{gpio_lower_half, Binding, Error, PinAdapter};
pub use mutex::IoMutex;
pub use port::{ExpanderError, Port, PortExpander, SubscriptionId};
pub use registry::{device_path, Entry, GpioRegistry, PinRegistry, RegistryError};

pub(crate) use bus::I2cExt;
