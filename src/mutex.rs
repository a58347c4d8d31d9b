/// Common interface for mutex implementations.
///
/// Both the expander driver and each pin adapter's interrupt binding are touched from the
/// consumer's context and from the expander's interrupt dispatch.  `ioexpander-gpio` guards them
/// with a mutex implementing this trait.  Implementations for the following types are provided:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For platforms where `std` is available. |
/// | [`critical_section::Mutex<RefCell<T>>`][mutex-cs] | `critical-section` | When `dispatch()` runs in an interrupt handler. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype:
///
/// ```
/// struct MyMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> ioexpander_gpio::IoMutex for MyMutex<T> {
///     type Data = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Data) -> R>(&self, f: F) -> R {
///         let mut v = self.0.lock().unwrap();
///         f(&mut v)
///     }
/// }
/// ```
pub trait IoMutex {
    /// The state wrapped inside this mutex.
    type Data;

    /// Create a new mutex of this type.
    fn create(v: Self::Data) -> Self;

    /// Lock the mutex and give a closure access to the state inside.
    ///
    /// Implementations are not reentrant: the closure must not lock the same mutex again.
    fn lock<R, F: FnOnce(&mut Self::Data) -> R>(&self, f: F) -> R;
}

impl<T> IoMutex for core::cell::RefCell<T> {
    type Data = T;

    fn create(v: Self::Data) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Data) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> IoMutex for std::sync::Mutex<T> {
    type Data = T;

    fn create(v: Self::Data) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Data) -> R>(&self, f: F) -> R {
        let mut v = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut v)
    }
}

#[cfg(feature = "critical-section")]
impl<T> IoMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Data = T;

    fn create(v: Self::Data) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Data) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow_ref_mut(cs);
            f(&mut v)
        })
    }
}
