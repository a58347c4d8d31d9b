//! Support for the `PCF8574` & `PCF8574A` "Remote 8-bit I/O expander for I2C-bus with interrupt"
//!
//! All pins are quasi-bidirectional: writing a 1 releases the pin so it can be used as an input.

pub struct Driver<I2C> {
    i2c: I2C,
    out: u8,
    addr: u8,
    changes: crate::common::ChangeTracker,
}

impl<I2C> Driver<I2C> {
    pub fn new(i2c: I2C, is_a_variant: bool, a0: bool, a1: bool, a2: bool) -> Self {
        let addr = if is_a_variant {
            0x38 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
        } else {
            0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
        };
        Self {
            i2c,
            out: 0xff,
            addr,
            changes: Default::default(),
        }
    }
}

impl<I2C: crate::I2cBus> Driver<I2C> {
    fn read_port(&mut self) -> Result<u8, I2C::BusError> {
        let mut buf = [0x00];
        self.i2c.read(self.addr, &mut buf)?;
        Ok(buf[0])
    }
}

impl<I2C: crate::I2cBus> crate::PortDriver for Driver<I2C> {
    type Error = I2C::BusError;

    const PINS: u8 = 8;

    fn set(&mut self, mask_high: u32, mask_low: u32) -> Result<(), Self::Error> {
        self.out |= mask_high as u8;
        self.out &= !mask_low as u8;
        self.i2c.write(self.addr, &[self.out])?;
        Ok(())
    }

    fn get(&mut self, mask_high: u32, mask_low: u32) -> Result<u32, Self::Error> {
        let in_ = self.read_port()? as u32;
        Ok((in_ & mask_high) | (!in_ & mask_low))
    }
}

impl<I2C: crate::I2cBus> crate::PortDriverInterrupts for Driver<I2C> {
    fn fetch_interrupt_state(&mut self) -> Result<(), Self::Error> {
        let input = self.read_port()?;
        self.changes.update(input as u32);
        Ok(())
    }

    fn query_pin_change(&mut self, mask: u32) -> u32 {
        self.changes.take(mask)
    }
}

#[cfg(test)]
mod tests {
    use crate::{PortDriver, PortDriverInterrupts};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn pcf8574() {
        let expectations = [
            mock_i2c::Transaction::write(0x21, vec![0b11111111]),
            mock_i2c::Transaction::write(0x21, vec![0b11111011]),
            mock_i2c::Transaction::read(0x21, vec![0b01000000]),
            mock_i2c::Transaction::read(0x21, vec![0b10111111]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = super::Driver::new(bus.clone(), false, true, false, false);

        drv.set(1 << 2, 0).unwrap();
        drv.set(0, 1 << 2).unwrap();

        assert_eq!(drv.get(1 << 6, 0).unwrap(), 1 << 6);
        assert_eq!(drv.get(0, 1 << 6).unwrap(), 1 << 6);

        bus.done();
    }

    #[test]
    fn pcf8574a_pin_changes() {
        let expectations = [
            mock_i2c::Transaction::read(0x39, vec![0b11111111]),
            mock_i2c::Transaction::read(0x39, vec![0b11110111]),
            mock_i2c::Transaction::read(0x39, vec![0b11111111]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut drv = super::Driver::new(bus.clone(), true, true, false, false);

        drv.fetch_interrupt_state().unwrap();
        assert_eq!(drv.query_pin_change(0xFF), 0);

        // p3 pulsed low between two queries, still reported once
        drv.fetch_interrupt_state().unwrap();
        drv.fetch_interrupt_state().unwrap();
        assert_eq!(drv.query_pin_change(0xFF), 1 << 3);
        assert_eq!(drv.query_pin_change(0xFF), 0);

        bus.done();
    }
}
