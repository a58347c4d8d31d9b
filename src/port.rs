//! An [`IoExpander`] on top of a port-expander chip driver.
//!
//! [`PortExpander`] adds interrupt subscriptions to a [`PortDriver`].  The chip's interrupt line
//! is not handled here: call [`PortExpander::dispatch()`] from whatever reacts to it (an EXTI
//! handler, a task waiting on the line, ...).
use crate::{
    Direction, IoExpander, IoMutex, IrqStatus, PinSet, PinSetHandler, PortDriver,
    PortDriverInterrupts, PortDriverTotemPole,
};
use core::cell::RefCell;
use log::{debug, trace, warn};

/// Errors of a [`PortExpander`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderError<E> {
    /// The chip driver failed.
    Bus(E),
    /// The subscription handle is not (or no longer) attached.
    UnknownHandle,
    /// The pin index is not below the chip's pin count.
    InvalidPin,
}

/// Handle for one interrupt subscription on a [`PortExpander`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId {
    slot: u8,
    generation: u16,
}

#[derive(Clone, Copy)]
struct Subscription<'a> {
    id: SubscriptionId,
    pinset: PinSet,
    handler: &'a dyn PinSetHandler<'a>,
}

/// Chip driver plus subscription table, kept together behind one mutex.
pub struct Port<'a, PD, const N: usize> {
    driver: PD,
    subscriptions: [Option<Subscription<'a>>; N],
    generation: u16,
}

/// An [`IoExpander`] with up to `N` interrupt subscriptions.
pub struct PortExpander<'a, PD, const N: usize = 8, M = RefCell<Port<'a, PD, N>>>
where
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    port: M,
    _pd: core::marker::PhantomData<&'a PD>,
}

impl<'a, PD> PortExpander<'a, PD>
where
    PD: PortDriver,
{
    pub fn new(driver: PD) -> Self {
        Self::with_mutex(driver)
    }
}

impl<'a, PD, const N: usize, M> PortExpander<'a, PD, N, M>
where
    PD: PortDriver,
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    pub fn with_mutex(driver: PD) -> Self {
        assert!(PD::PINS <= 32);
        assert!(N <= u8::MAX as usize);
        Self {
            port: IoMutex::create(Port {
                driver,
                subscriptions: [None; N],
                generation: 0,
            }),
            _pd: core::marker::PhantomData,
        }
    }

    /// Number of live interrupt subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.port
            .lock(|port| port.subscriptions.iter().flatten().count())
    }
}

impl<'a, PD, const N: usize, M> PortExpander<'a, PD, N, M>
where
    PD: PortDriverTotemPole,
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    /// Configure `pin` as input or output.  Outputs start at level `state`.
    pub fn set_direction(
        &self,
        pin: u8,
        dir: Direction,
        state: bool,
    ) -> Result<(), ExpanderError<PD::Error>> {
        assert!(pin < PD::PINS);
        self.port
            .lock(|port| port.driver.set_direction(1 << pin, dir, state))
            .map_err(ExpanderError::Bus)
    }
}

impl<'a, PD, const N: usize, M> PortExpander<'a, PD, N, M>
where
    PD: PortDriverInterrupts,
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    /// Collect pin changes from the chip and hand them to the subscribed handlers.
    ///
    /// Handlers run after the expander's lock is released, so they may attach or detach.  A
    /// subscription detached by an earlier handler of the same round is skipped.
    /// Returns how many handlers reported [`IrqStatus::Handled`].
    pub fn dispatch(&self) -> Result<usize, ExpanderError<PD::Error>> {
        let mut pending: [Option<(SubscriptionId, PinSet)>; N] = [None; N];

        let changed = self.port.lock(|port| -> Result<PinSet, ExpanderError<PD::Error>> {
            port.driver
                .fetch_interrupt_state()
                .map_err(ExpanderError::Bus)?;
            let changed = PinSet::from_bits(port.driver.query_pin_change(u32::MAX));

            for (sub, pend) in port.subscriptions.iter().zip(pending.iter_mut()) {
                if let Some(sub) = sub {
                    let hit = sub.pinset & changed;
                    if !hit.is_empty() {
                        *pend = Some((sub.id, hit));
                    }
                }
            }
            Ok(changed)
        })?;
        trace!("dispatch: changed={:#x}", changed.bits());

        let handled = pending
            .iter()
            .flatten()
            .filter_map(|&(id, pinset)| {
                let handler = self.live_handler(id)?;
                Some(handler.on_interrupt(pinset))
            })
            .filter(|status| *status == IrqStatus::Handled)
            .count();
        Ok(handled)
    }
}

impl<'a, PD, const N: usize, M> PortExpander<'a, PD, N, M>
where
    PD: PortDriver,
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    /// The handler of subscription `id`, if it is still attached.
    fn live_handler(&self, id: SubscriptionId) -> Option<&'a dyn PinSetHandler<'a>> {
        self.port.lock(|port| match port.subscriptions.get(id.slot as usize) {
            Some(Some(sub)) if sub.id == id => Some(sub.handler),
            _ => {
                trace!("dispatch: {:?} detached meanwhile", id);
                None
            }
        })
    }

    fn check_pin(&self, pin: u8) -> Result<u32, ExpanderError<PD::Error>> {
        if pin >= PD::PINS {
            warn!("pin{}: out of range, chip has {} pins", pin, PD::PINS);
            return Err(ExpanderError::InvalidPin);
        }
        Ok(PinSet::single(pin).bits())
    }
}

impl<'a, PD, const N: usize, M> IoExpander<'a> for PortExpander<'a, PD, N, M>
where
    PD: PortDriver,
    M: IoMutex<Data = Port<'a, PD, N>>,
{
    type Error = ExpanderError<PD::Error>;
    type Handle = SubscriptionId;

    fn pin_count(&self) -> u8 {
        PD::PINS
    }

    fn read_pin(&self, pin: u8) -> Result<bool, Self::Error> {
        let mask = self.check_pin(pin)?;
        self.port
            .lock(|port| port.driver.get(mask, 0))
            .map(|hit| hit != 0)
            .map_err(ExpanderError::Bus)
    }

    fn write_pin(&self, pin: u8, value: bool) -> Result<(), Self::Error> {
        let mask = self.check_pin(pin)?;
        self.port
            .lock(|port| {
                if value {
                    port.driver.set(mask, 0)
                } else {
                    port.driver.set(0, mask)
                }
            })
            .map_err(ExpanderError::Bus)
    }

    fn attach(&self, pinset: PinSet, handler: &'a dyn PinSetHandler<'a>) -> Option<Self::Handle> {
        let valid = !pinset.is_empty() && (PD::PINS >= 32 || pinset.bits() >> PD::PINS == 0);
        if !valid {
            warn!("attach: pinset {:#x} outside of the chip", pinset.bits());
            return None;
        }

        self.port.lock(|port| {
            let Some(slot) = port.subscriptions.iter().position(Option::is_none) else {
                warn!("attach: all {} subscriptions in use", N);
                return None;
            };
            port.generation = port.generation.wrapping_add(1);
            let id = SubscriptionId {
                slot: slot as u8,
                generation: port.generation,
            };
            port.subscriptions[slot] = Some(Subscription {
                id,
                pinset,
                handler,
            });
            debug!("attach: {:?} for pinset {:#x}", id, pinset.bits());
            Some(id)
        })
    }

    fn detach(&self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.port.lock(|port| -> Result<(), Self::Error> {
            let slot = port
                .subscriptions
                .get_mut(handle.slot as usize)
                .ok_or(ExpanderError::UnknownHandle)?;
            if !matches!(slot, Some(sub) if sub.id == handle) {
                warn!("detach: {:?} is not attached", handle);
                return Err(ExpanderError::UnknownHandle);
            }
            *slot = None;
            debug!("detach: {:?}", handle);
            Ok(())
        })
    }
}
