//! The device module contains the chip drivers the [`PortExpander`][crate::PortExpander] can sit
//! on top of.
//!
//! Other chips can be used by implementing [`PortDriver`][crate::PortDriver] and
//! [`PortDriverInterrupts`][crate::PortDriverInterrupts] for them.

pub mod pca9555;
pub mod pcf8574;
