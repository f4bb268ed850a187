//! Register transport: 16-bit addressed, 8-bit valued register access over a
//! [`RegisterBus`].
//!
//! Wire shape:
//! - write: `[addr_hi, addr_lo, value]` in one transaction
//! - read: write `[addr_hi, addr_lo]`, then read one byte, as one combined
//!   transaction
//!
//! No retries happen here; retry policy belongs to the caller.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use log::trace;

use crate::error::TransportError;
use crate::traits::RegisterBus;

/// Register-level access to the sensor.
#[derive(Debug)]
pub struct RegisterTransport<B> {
    bus: B,
}

impl<B: RegisterBus> RegisterTransport<B> {
    /// Wrap a bus.
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Write `value` to the register at `address`.
    pub fn write(&mut self, address: u16, value: u8) -> Result<(), TransportError> {
        let [hi, lo] = address.to_be_bytes();
        let frame = [hi, lo, value];
        let moved = self.bus.write(&frame).map_err(TransportError::Bus)?;
        check_transfer(frame.len(), moved)?;
        trace!("reg {address:#06x} <- {value:#04x}");
        Ok(())
    }

    /// Read the register at `address`.
    pub fn read(&mut self, address: u16) -> Result<u8, TransportError> {
        let mut value = [0u8; 1];
        let received = self
            .bus
            .write_read(&address.to_be_bytes(), &mut value)
            .map_err(TransportError::Bus)?;
        check_transfer(value.len(), received)?;
        let [value] = value;
        trace!("reg {address:#06x} -> {value:#04x}");
        Ok(value)
    }

    /// Borrow the underlying bus.
    pub const fn bus(&self) -> &B {
        &self.bus
    }
}

const fn check_transfer(expected: usize, actual: usize) -> Result<(), TransportError> {
    if actual < expected {
        Err(TransportError::ShortTransfer { expected, actual })
    } else {
        Ok(())
    }
}

/// [`RegisterBus`] over an `embedded-hal` I2C bus and a 7-bit device address.
///
/// `embedded-hal` transfers either move every byte or fail, so a successful
/// call always reports the full length.
#[derive(Debug)]
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cBus<I2C> {
    /// Bind an I2C bus to the sensor at `address`.
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// The sensor's bus address.
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Release the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cBus<I2C> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ErrorKind> {
        self.i2c
            .write(self.address, bytes)
            .map(|()| bytes.len())
            .map_err(|err| err.kind())
    }

    fn write_read(&mut self, out: &[u8], input: &mut [u8]) -> Result<usize, ErrorKind> {
        self.i2c
            .write_read(self.address, out, input)
            .map(|()| input.len())
            .map_err(|err| err.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BusFault, BusTransaction, MockBus};
    use embedded_hal::i2c::{NoAcknowledgeSource, Operation};

    #[test]
    fn test_write_frame_shape() {
        let bus = MockBus::new();
        let mut transport = RegisterTransport::new(bus.clone());

        transport.write(0x0100, 0x01).expect("write should succeed");

        assert_eq!(
            bus.transactions(),
            vec![BusTransaction::Write {
                bytes: vec![0x01, 0x00, 0x01]
            }]
        );
        assert_eq!(bus.register(0x0100), Some(0x01));
    }

    #[test]
    fn test_read_frame_shape() {
        let bus = MockBus::new();
        bus.set_register(0x300B, 0x5A);
        let mut transport = RegisterTransport::new(bus.clone());

        let value = transport.read(0x300B).expect("read should succeed");

        assert_eq!(value, 0x5A);
        assert_eq!(
            bus.transactions(),
            vec![BusTransaction::WriteRead {
                out: vec![0x30, 0x0B],
                read_len: 1
            }]
        );
    }

    #[test]
    fn test_short_write_is_reported() {
        let bus = MockBus::new();
        bus.inject_fault(0x3009, BusFault::Short(2));
        let mut transport = RegisterTransport::new(bus);

        let err = transport.write(0x3009, 0x07).expect_err("write should fail");
        assert_eq!(
            err,
            TransportError::ShortTransfer {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_short_read_is_reported() {
        let bus = MockBus::new();
        bus.inject_fault(0x300A, BusFault::Short(0));
        let mut transport = RegisterTransport::new(bus);

        let err = transport.read(0x300A).expect_err("read should fail");
        assert_eq!(
            err,
            TransportError::ShortTransfer {
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_bus_fault_is_reported_without_retry() {
        let bus = MockBus::new();
        bus.inject_fault(0x0100, BusFault::Bus(ErrorKind::ArbitrationLoss));
        let mut transport = RegisterTransport::new(bus.clone());

        let err = transport.write(0x0100, 0x01).expect_err("write should fail");

        assert_eq!(err, TransportError::Bus(ErrorKind::ArbitrationLoss));
        assert_eq!(bus.transactions().len(), 1);
    }

    /// Minimal `embedded-hal` I2C double for the adapter tests.
    struct FakeI2c {
        nack: bool,
        seen: Vec<(u8, Vec<u8>)>,
    }

    #[derive(Debug)]
    struct FakeError;

    impl embedded_hal::i2c::Error for FakeError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        }
    }

    impl embedded_hal::i2c::ErrorType for FakeI2c {
        type Error = FakeError;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.nack {
                return Err(FakeError);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.seen.push((address, bytes.to_vec())),
                    Operation::Read(buf) => buf.fill(0xA5),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_i2c_bus_adapter_moves_full_frames() {
        let i2c = FakeI2c {
            nack: false,
            seen: Vec::new(),
        };
        let mut transport = RegisterTransport::new(I2cBus::new(i2c, 0x1A));

        transport.write(0x3000, 0x00).expect("write should succeed");
        let value = transport.read(0x0100).expect("read should succeed");

        assert_eq!(value, 0xA5);
        assert_eq!(transport.bus().address(), 0x1A);
    }

    #[test]
    fn test_i2c_bus_adapter_maps_error_kind() {
        let i2c = FakeI2c {
            nack: true,
            seen: Vec::new(),
        };
        let mut transport = RegisterTransport::new(I2cBus::new(i2c, 0x1A));

        let err = transport.write(0x3000, 0x00).expect_err("write should fail");
        assert_eq!(
            err,
            TransportError::Bus(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
        );
    }

    #[test]
    fn test_i2c_bus_adapter_addresses_sensor() {
        let i2c = FakeI2c {
            nack: false,
            seen: Vec::new(),
        };
        let mut bus = I2cBus::new(i2c, 0x1A);

        RegisterBus::write(&mut bus, &[0x30, 0x00, 0x00]).expect("write should succeed");

        let i2c = bus.release();
        assert_eq!(i2c.seen, vec![(0x1A, vec![0x30, 0x00, 0x00])]);
    }
}
