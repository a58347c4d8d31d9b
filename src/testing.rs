//! Test doubles: a recording expander and a few interrupt callbacks.

use crate::{GpioDevice, IoExpander, IrqStatus, PinCallback, PinSet, PinSetHandler};
use std::cell::{Cell, RefCell};
use std::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Read(u8),
    Write(u8, bool),
    Attach(PinSet),
    Detach(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeError {
    Io,
    Detach,
}

/// Expander that records every call and delivers interrupts on demand through `fire()`.
pub struct FakeExpander<'a> {
    pins: u8,
    level: Cell<bool>,
    fail_io: Cell<bool>,
    fail_attach: Cell<bool>,
    fail_detach: Cell<bool>,
    next_handle: Cell<u32>,
    calls: RefCell<Vec<Call>>,
    subscriptions: RefCell<Vec<(u32, PinSet, &'a dyn PinSetHandler<'a>)>>,
}

impl<'a> FakeExpander<'a> {
    pub fn new(pins: u8) -> Self {
        Self {
            pins,
            level: Cell::new(false),
            fail_io: Cell::new(false),
            fail_attach: Cell::new(false),
            fail_detach: Cell::new(false),
            next_handle: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    pub fn set_level(&self, level: bool) {
        self.level.set(level);
    }

    pub fn fail_io(&self, fail: bool) {
        self.fail_io.set(fail);
    }

    pub fn fail_attach(&self, fail: bool) {
        self.fail_attach.set(fail);
    }

    pub fn fail_detach(&self, fail: bool) {
        self.fail_detach.set(fail);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Deliver an interrupt for `pinset` to every matching subscriber.
    pub fn fire(&self, pinset: PinSet) -> Vec<IrqStatus> {
        let hit: Vec<_> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|(_, set, _)| !(*set & pinset).is_empty())
            .map(|(_, set, handler)| (*set & pinset, *handler))
            .collect();

        hit.into_iter()
            .map(|(set, handler)| handler.on_interrupt(set))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl<'a> IoExpander<'a> for FakeExpander<'a> {
    type Error = FakeError;
    type Handle = u32;

    fn pin_count(&self) -> u8 {
        self.pins
    }

    fn read_pin(&self, pin: u8) -> Result<bool, Self::Error> {
        self.record(Call::Read(pin));
        if self.fail_io.get() {
            return Err(FakeError::Io);
        }
        Ok(self.level.get())
    }

    fn write_pin(&self, pin: u8, value: bool) -> Result<(), Self::Error> {
        self.record(Call::Write(pin, value));
        if self.fail_io.get() {
            return Err(FakeError::Io);
        }
        self.level.set(value);
        Ok(())
    }

    fn attach(&self, pinset: PinSet, handler: &'a dyn PinSetHandler<'a>) -> Option<Self::Handle> {
        self.record(Call::Attach(pinset));
        if self.fail_attach.get() {
            return None;
        }
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.subscriptions
            .borrow_mut()
            .push((handle, pinset, handler));
        Some(handle)
    }

    fn detach(&self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.record(Call::Detach(handle));
        // the subscription is gone either way, only the report differs
        self.subscriptions.borrow_mut().retain(|(h, _, _)| *h != handle);
        if self.fail_detach.get() {
            return Err(FakeError::Detach);
        }
        Ok(())
    }
}

/// Counts invocations and remembers which device it was called with.
pub struct Recorder {
    status: IrqStatus,
    count: Cell<usize>,
    last: Cell<*const ()>,
}

impl Recorder {
    pub fn new(status: IrqStatus) -> Self {
        Self {
            status,
            count: Cell::new(0),
            last: Cell::new(core::ptr::null()),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn last_was<T>(&self, dev: &T) -> bool {
        core::ptr::eq(self.last.get(), dev as *const T as *const ())
    }
}

impl<'a, E> PinCallback<'a, E> for Recorder {
    fn fired(&self, gpio: &'a dyn GpioDevice<'a, Error = E>) -> IrqStatus {
        self.count.set(self.count.get() + 1);
        self.last.set(gpio as *const _ as *const ());
        self.status
    }
}

/// Disarms its own interrupt from inside the callback.
pub struct Reenter {
    result: Cell<Option<bool>>,
}

impl Reenter {
    pub fn new() -> Self {
        Self {
            result: Cell::new(None),
        }
    }

    /// Whether the nested `enable(false)` ran and succeeded.
    pub fn disabled(&self) -> bool {
        self.result.get() == Some(true)
    }
}

impl<'a, E> PinCallback<'a, E> for Reenter {
    fn fired(&self, gpio: &'a dyn GpioDevice<'a, Error = E>) -> IrqStatus {
        self.result.set(Some(gpio.enable(false).is_ok()));
        IrqStatus::Handled
    }
}
