//! GPIO lower half for I/O-expander pins.
//!
//! A [`PinAdapter`] makes one pin of an [`IoExpander`] look like a standalone [`GpioDevice`].
//! Reads and writes go straight to the expander.  Interrupts are subscribed on the pin's
//! [`PinSet`] when enabled and forwarded to the attached [`PinCallback`].
//!
//! ## Example
//! ```
//! # use ioexpander_gpio::{dev::pca9555, gpio_lower_half, GpioDevice, PinAdapter, PinRegistry, PinType, PortExpander};
//! # use embedded_hal_mock::eh1::i2c as mock_i2c;
//! # let mut bus = mock_i2c::Mock::new(&[mock_i2c::Transaction::write(0x20, vec![0x02, 0xf7])]);
//! let expander = PortExpander::new(pca9555::Driver::new(bus.clone(), false, false, false));
//! let mut slot = None;
//! let registry = PinRegistry::<_, 4>::new();
//!
//! let pin3: &PinAdapter<_> = gpio_lower_half(&mut slot, &expander, 3, PinType::Output, 0, &registry).unwrap();
//! pin3.write(false).unwrap();
//! assert!(registry.lookup("/dev/gpout0").is_some());
//! # bus.done();
//! ```
use crate::{
    GpioDevice, GpioRegistry, InvalidPinType, IoExpander, IoMutex, IrqStatus, PinCallback, PinSet,
    PinSetHandler, PinType, RegistryError,
};
use core::cell::RefCell;
use log::{debug, error, trace, warn};

/// Errors of a [`PinAdapter`], generic over the expander's error type `E`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// Pin index or pin type out of range.
    InvalidArgument,
    /// No storage for the adapter.
    OutOfMemory,
    /// Interrupt enabled before a callback was attached.
    NotAttached,
    /// The expander could not allocate an interrupt subscription.
    AttachFailed,
    /// The registry refused the device.
    Registry(RegistryError),
    /// Error reported by the expander, passed through unchanged.
    Expander(E),
}

impl<E: core::fmt::Debug> embedded_hal::digital::Error for Error<E> {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl<E> From<InvalidPinType> for Error<E> {
    fn from(e: InvalidPinType) -> Self {
        error!("pin type {} unknown", e.0);
        Error::InvalidArgument
    }
}

/// Interrupt binding of a [`PinAdapter`]: the attached callback and the live subscription, if any.
pub struct Binding<'a, P: IoExpander<'a>> {
    handle: Option<P::Handle>,
    callback: Option<&'a dyn PinCallback<'a, Error<P::Error>>>,
}

impl<'a, P: IoExpander<'a>> Binding<'a, P> {
    fn new() -> Self {
        Self {
            handle: None,
            callback: None,
        }
    }
}

/// One I/O-expander pin, exposed as a [`GpioDevice`].
///
/// The binding is kept behind `M`.  The default [`RefCell`] is enough when the expander
/// dispatches interrupts from the same execution context as the consumer; use a
/// `critical_section::Mutex<RefCell<_>>` when dispatch happens in an interrupt handler.
pub struct PinAdapter<'a, P, M = RefCell<Binding<'a, P>>>
where
    P: IoExpander<'a>,
    M: IoMutex<Data = Binding<'a, P>>,
{
    pin: u8,
    pintype: PinType,
    minor: u8,
    ioe: &'a P,
    binding: M,
}

impl<'a, P> PinAdapter<'a, P>
where
    P: IoExpander<'a>,
{
    /// Create an unregistered adapter.  See [`gpio_lower_half`] for the registering constructor.
    pub fn new(ioe: &'a P, pin: u8, pintype: PinType, minor: u8) -> Result<Self, Error<P::Error>> {
        Self::with_mutex(ioe, pin, pintype, minor)
    }
}

impl<'a, P, M> PinAdapter<'a, P, M>
where
    P: IoExpander<'a>,
    M: IoMutex<Data = Binding<'a, P>>,
{
    pub fn with_mutex(
        ioe: &'a P,
        pin: u8,
        pintype: PinType,
        minor: u8,
    ) -> Result<Self, Error<P::Error>> {
        if pin >= ioe.pin_count() || pin >= 32 {
            error!(
                "pin{}: out of range, expander has {} pins",
                pin,
                ioe.pin_count()
            );
            return Err(Error::InvalidArgument);
        }

        Ok(Self {
            pin,
            pintype,
            minor,
            ioe,
            binding: IoMutex::create(Binding::new()),
        })
    }

    /// Pin index within the expander.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// Whether an interrupt subscription is currently held.
    pub fn is_enabled(&self) -> bool {
        self.binding.lock(|b| b.handle.is_some())
    }

    /// Whether a callback is attached.
    pub fn is_attached(&self) -> bool {
        self.binding.lock(|b| b.callback.is_some())
    }

    /// Detach any live subscription, drop the callback and remove the device from `registry`.
    ///
    /// The subscription is forgotten even if the expander fails to detach it.  The first error
    /// encountered is returned, after all steps have run.
    pub fn teardown<R>(&self, registry: &R) -> Result<(), Error<P::Error>>
    where
        R: GpioRegistry<'a, Error<P::Error>> + ?Sized,
    {
        let detached = self.binding.lock(|b| {
            b.callback = None;
            match b.handle.take() {
                Some(handle) => {
                    debug!("pin{}: teardown, detaching {:?}", self.pin, handle);
                    self.ioe.detach(handle).map_err(|e| {
                        error!("pin{}: detach failed during teardown", self.pin);
                        Error::Expander(e)
                    })
                }
                None => Ok(()),
            }
        });

        let unregistered = registry
            .unregister(self.pintype, self.minor)
            .map_err(Error::Registry);

        detached.and(unregistered)
    }
}

impl<'a, P, M> GpioDevice<'a> for PinAdapter<'a, P, M>
where
    P: IoExpander<'a> + 'a,
    M: IoMutex<Data = Binding<'a, P>> + 'a,
{
    type Error = Error<P::Error>;

    fn pin_type(&self) -> PinType {
        self.pintype
    }

    fn read(&self) -> Result<bool, Self::Error> {
        trace!("pin{}: read", self.pin);
        self.ioe.read_pin(self.pin).map_err(Error::Expander)
    }

    fn write(&self, value: bool) -> Result<(), Self::Error> {
        trace!("pin{}: write {}", self.pin, value);
        self.ioe.write_pin(self.pin, value).map_err(Error::Expander)
    }

    fn attach(
        &self,
        callback: Option<&'a dyn PinCallback<'a, Self::Error>>,
    ) -> Result<(), Self::Error> {
        debug!("pin{}: attach callback={}", self.pin, callback.is_some());

        self.binding.lock(|b| {
            if let Some(handle) = b.handle.take() {
                debug!("pin{}: detaching {:?}", self.pin, handle);
                if self.ioe.detach(handle).is_err() {
                    warn!("pin{}: detach of {:?} failed, dropping it", self.pin, handle);
                }
            }
            b.callback = callback;
        });

        Ok(())
    }

    fn enable(&'a self, enable: bool) -> Result<(), Self::Error> {
        self.binding.lock(|b| {
            debug!(
                "pin{}: {} callback={} handle={:?}",
                self.pin,
                if enable { "enabling" } else { "disabling" },
                b.callback.is_some(),
                b.handle
            );

            if enable {
                if b.callback.is_none() {
                    warn!("pin{}: enable before attach", self.pin);
                    return Err(Error::NotAttached);
                }
                if b.handle.is_some() {
                    return Ok(());
                }

                match self.ioe.attach(PinSet::single(self.pin), self) {
                    Some(handle) => {
                        debug!("pin{}: attached as {:?}", self.pin, handle);
                        b.handle = Some(handle);
                        Ok(())
                    }
                    None => {
                        error!("pin{}: expander attach failed", self.pin);
                        Err(Error::AttachFailed)
                    }
                }
            } else {
                // the handle is gone after this, whatever the expander says
                match b.handle.take() {
                    None => {
                        warn!("pin{}: already detached", self.pin);
                        Ok(())
                    }
                    Some(handle) => self.ioe.detach(handle).map_err(|e| {
                        error!("pin{}: detach of {:?} failed", self.pin, handle);
                        Error::Expander(e)
                    }),
                }
            }
        })
    }
}

impl<'a, P, M> PinSetHandler<'a> for PinAdapter<'a, P, M>
where
    P: IoExpander<'a> + 'a,
    M: IoMutex<Data = Binding<'a, P>> + 'a,
{
    fn on_interrupt(&'a self, pinset: PinSet) -> IrqStatus {
        // not held while the callback runs, so it may call back into this adapter
        let callback = self.binding.lock(|b| b.callback);
        trace!("pin{}: interrupt, pinset={:#x}", self.pin, pinset.bits());

        let Some(callback) = callback else {
            panic!("pin{}: interrupt dispatched with no callback attached", self.pin);
        };
        callback.fired(self)
    }
}

impl<'a, P, M> embedded_hal::digital::ErrorType for PinAdapter<'a, P, M>
where
    P: IoExpander<'a>,
    P::Error: core::fmt::Debug,
    M: IoMutex<Data = Binding<'a, P>>,
{
    type Error = Error<P::Error>;
}

impl<'a, P, M> embedded_hal::digital::InputPin for PinAdapter<'a, P, M>
where
    P: IoExpander<'a> + 'a,
    P::Error: core::fmt::Debug,
    M: IoMutex<Data = Binding<'a, P>> + 'a,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        GpioDevice::read(self)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        GpioDevice::read(self).map(|b| !b)
    }
}

impl<'a, P, M> embedded_hal::digital::OutputPin for PinAdapter<'a, P, M>
where
    P: IoExpander<'a> + 'a,
    P::Error: core::fmt::Debug,
    M: IoMutex<Data = Binding<'a, P>> + 'a,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        GpioDevice::write(self, false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        GpioDevice::write(self, true)
    }
}

/// Create a GPIO pin device for pin `pin` of `ioe` and register it under `minor`.
///
/// The adapter is placed into `slot`, which must be empty.  If the registry refuses the device,
/// nothing stays registered and the adapter in `slot` is left without callback or subscription.
/// `slot` stays borrowed for `'a` either way, so after a failure it can neither be reused nor
/// inspected; the inert adapter is released only when the slot itself goes out of scope.
pub fn gpio_lower_half<'a, P, M, R>(
    slot: &'a mut Option<PinAdapter<'a, P, M>>,
    ioe: &'a P,
    pin: u8,
    pintype: PinType,
    minor: u8,
    registry: &R,
) -> Result<&'a PinAdapter<'a, P, M>, Error<P::Error>>
where
    P: IoExpander<'a> + 'a,
    M: IoMutex<Data = Binding<'a, P>> + 'a,
    R: GpioRegistry<'a, Error<P::Error>> + ?Sized,
{
    let adapter = PinAdapter::with_mutex(ioe, pin, pintype, minor)?;
    if slot.is_some() {
        error!("pin{}: adapter storage already in use", pin);
        return Err(Error::OutOfMemory);
    }
    let adapter: &'a PinAdapter<'a, P, M> = slot.insert(adapter);

    registry.register(minor, adapter).map_err(|e| {
        error!("pin{}: registration as minor {} failed: {:?}", pin, minor, e);
        Error::Registry(e)
    })?;

    Ok(adapter)
}
