//! A fixed-capacity registry of GPIO pin devices, addressed by device path.
//!
//! Devices are named `/dev/gpinN`, `/dev/gpoutN` or `/dev/gpintN` after their [`PinType`] and minor
//! number.  Two devices of the same class cannot share a minor.
use crate::{GpioDevice, IoMutex, PinType};
use core::cell::RefCell;
use core::fmt::Write;
use log::{debug, warn};

/// Errors of a [`GpioRegistry`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A device with the same path is already registered.
    Exists,
    /// The registry is full.
    NoSpace,
    /// No device with this path is registered.
    NotFound,
}

/// Something pin devices can be registered with.
pub trait GpioRegistry<'a, E> {
    /// Make `dev` available under the path for its pin type and `minor`.
    fn register(&self, minor: u8, dev: &'a dyn GpioDevice<'a, Error = E>)
        -> Result<(), RegistryError>;

    /// Remove the device registered for `pintype` and `minor`.
    fn unregister(&self, pintype: PinType, minor: u8) -> Result<(), RegistryError>;
}

/// Device path of a pin device, e.g. `/dev/gpout3`.
pub fn device_path(pintype: PinType, minor: u8) -> heapless::String<16> {
    let mut path = heapless::String::new();
    // "/dev/gpout255" is the longest possible path
    let _ = write!(path, "/dev/{}{}", pintype.prefix(), minor);
    path
}

/// One registered device.
pub struct Entry<'a, E> {
    path: heapless::String<16>,
    dev: &'a dyn GpioDevice<'a, Error = E>,
}

/// [`GpioRegistry`] with room for `N` devices.
///
/// Registered devices are borrowed for `'a`, so the registry must be dropped before them.
pub struct PinRegistry<'a, E, const N: usize, M = RefCell<heapless::Vec<Entry<'a, E>, N>>>
where
    M: IoMutex<Data = heapless::Vec<Entry<'a, E>, N>>,
{
    entries: M,
    _e: core::marker::PhantomData<Entry<'a, E>>,
}

impl<'a, E, const N: usize> PinRegistry<'a, E, N> {
    pub fn new() -> Self {
        Self::with_mutex()
    }
}

impl<'a, E, const N: usize> Default for PinRegistry<'a, E, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, E, const N: usize, M> PinRegistry<'a, E, N, M>
where
    M: IoMutex<Data = heapless::Vec<Entry<'a, E>, N>>,
{
    pub fn with_mutex() -> Self {
        Self {
            entries: IoMutex::create(heapless::Vec::new()),
            _e: core::marker::PhantomData,
        }
    }

    /// Find the device registered under `path`.
    pub fn lookup(&self, path: &str) -> Option<&'a dyn GpioDevice<'a, Error = E>> {
        self.entries.lock(|entries| {
            entries
                .iter()
                .find(|entry| entry.path.as_str() == path)
                .map(|entry| entry.dev)
        })
    }

    /// Find the device registered for `pintype` and `minor`.
    pub fn get(&self, pintype: PinType, minor: u8) -> Option<&'a dyn GpioDevice<'a, Error = E>> {
        self.lookup(&device_path(pintype, minor))
    }

    pub fn len(&self) -> usize {
        self.entries.lock(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, E, const N: usize, M> GpioRegistry<'a, E> for PinRegistry<'a, E, N, M>
where
    M: IoMutex<Data = heapless::Vec<Entry<'a, E>, N>>,
{
    fn register(
        &self,
        minor: u8,
        dev: &'a dyn GpioDevice<'a, Error = E>,
    ) -> Result<(), RegistryError> {
        let path = device_path(dev.pin_type(), minor);

        self.entries.lock(|entries| {
            if entries.iter().any(|entry| entry.path == path) {
                warn!("register: {} already exists", path.as_str());
                return Err(RegistryError::Exists);
            }
            debug!("register: {}", path.as_str());
            entries.push(Entry { path, dev }).map_err(|entry| {
                warn!("register: no room for {}", entry.path.as_str());
                RegistryError::NoSpace
            })
        })
    }

    fn unregister(&self, pintype: PinType, minor: u8) -> Result<(), RegistryError> {
        let path = device_path(pintype, minor);

        self.entries.lock(|entries| {
            let Some(index) = entries.iter().position(|entry| entry.path == path) else {
                warn!("unregister: {} not found", path.as_str());
                return Err(RegistryError::NotFound);
            };
            entries.swap_remove(index);
            debug!("unregister: {}", path.as_str());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{device_path, GpioRegistry, PinRegistry, RegistryError};
    use crate::testing::FakeExpander;
    use crate::{GpioDevice, PinAdapter, PinType};

    type Adapter<'a> = PinAdapter<'a, FakeExpander<'a>>;

    #[test]
    fn path_naming() {
        assert_eq!(device_path(PinType::Input, 0).as_str(), "/dev/gpin0");
        assert_eq!(device_path(PinType::InputPullUp, 12).as_str(), "/dev/gpin12");
        assert_eq!(device_path(PinType::OutputOpenDrain, 3).as_str(), "/dev/gpout3");
        assert_eq!(device_path(PinType::InterruptFalling, 255).as_str(), "/dev/gpint255");
    }

    #[test]
    fn register_lookup_unregister() {
        let ioe = FakeExpander::new(8);
        let out = Adapter::new(&ioe, 1, PinType::Output, 4).unwrap();
        let registry = PinRegistry::<_, 2>::new();

        registry.register(4, &out).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup("/dev/gpout4").map(|d| d.pin_type()),
            Some(PinType::Output)
        );
        assert!(registry.get(PinType::OutputOpenDrain, 4).is_some());
        assert!(registry.lookup("/dev/gpin4").is_none());

        registry.unregister(PinType::Output, 4).unwrap();
        assert!(registry.is_empty());
        assert_eq!(
            registry.unregister(PinType::Output, 4),
            Err(RegistryError::NotFound)
        );
    }

    #[test]
    fn same_minor_in_different_classes() {
        let ioe = FakeExpander::new(8);
        let input = Adapter::new(&ioe, 0, PinType::InputPullDown, 0).unwrap();
        let output = Adapter::new(&ioe, 1, PinType::Output, 0).unwrap();
        let irq = Adapter::new(&ioe, 2, PinType::InterruptLow, 0).unwrap();
        let registry = PinRegistry::<_, 4>::new();

        registry.register(0, &input).unwrap();
        registry.register(0, &output).unwrap();
        registry.register(0, &irq).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.lookup("/dev/gpint0").map(|d| d.pin_type()),
            Some(PinType::InterruptLow)
        );
    }

    #[test]
    fn duplicate_path() {
        let ioe = FakeExpander::new(8);
        let a = Adapter::new(&ioe, 0, PinType::Input, 5).unwrap();
        let b = Adapter::new(&ioe, 1, PinType::InputPullUp, 5).unwrap();
        let registry = PinRegistry::<_, 4>::new();

        registry.register(5, &a).unwrap();
        assert_eq!(registry.register(5, &b), Err(RegistryError::Exists));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn capacity() {
        let ioe = FakeExpander::new(8);
        let a = Adapter::new(&ioe, 0, PinType::Input, 0).unwrap();
        let b = Adapter::new(&ioe, 1, PinType::Input, 1).unwrap();
        let c = Adapter::new(&ioe, 2, PinType::Input, 2).unwrap();
        let registry = PinRegistry::<_, 2>::new();

        registry.register(0, &a).unwrap();
        registry.register(1, &b).unwrap();
        assert_eq!(registry.register(2, &c), Err(RegistryError::NoSpace));

        // room again after removal
        registry.unregister(PinType::Input, 0).unwrap();
        registry.register(2, &c).unwrap();
        assert!(registry.get(PinType::Input, 2).is_some());
    }

    #[test]
    fn registered_device_is_usable() {
        let ioe = FakeExpander::new(8);
        let out = Adapter::new(&ioe, 6, PinType::Output, 1).unwrap();
        let registry = PinRegistry::<_, 2>::new();

        registry.register(1, &out).unwrap();
        let dev = registry.lookup("/dev/gpout1").unwrap();
        dev.write(true).unwrap();
        assert!(dev.read().unwrap());
    }
}
