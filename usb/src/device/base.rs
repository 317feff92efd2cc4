use crate::{PID_NETPOWER, VID_NETPOWER};
use rusb::Direction;
use std::time::Duration;

/// Everything the controller needs from the host's USB stack. This is passed into
/// [`NetPower::open`](crate::netpower::NetPower::open) rather than reaching for libusb's global
/// context directly, so a scripted registry can stand in for real hardware.
pub trait DeviceRegistry {
    /// Lists the currently attached devices, in whatever order the host reports them.
    fn devices(&self) -> Result<Vec<UsbDevice>, rusb::Error>;

    /// Opens the device at the given bus location.
    fn open(&self, device: &UsbDevice) -> Result<Box<dyn ControlTransport>, rusb::Error>;
}

pub trait ControlTransport {
    /// Performs a single blocking control transfer, returning the transfer's result value (the
    /// number of bytes moved in the data stage).
    fn control_transfer(&mut self, request: &ControlRequest) -> Result<usize, rusb::Error>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceIdentity {
    pub(crate) vendor_id: u16,
    pub(crate) product_id: u16,
}

impl DeviceIdentity {
    pub const NET_POWER_8800: DeviceIdentity = DeviceIdentity {
        vendor_id: VID_NETPOWER,
        product_id: PID_NETPOWER,
    };

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

// We primarily need the bus number, and address to reopen the device, the ids are only kept
// for filtering..
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UsbDevice {
    pub(crate) bus_number: u8,
    pub(crate) address: u8,
    pub(crate) vendor_id: u16,
    pub(crate) product_id: u16,
}

impl UsbDevice {
    pub fn new(bus_number: u8, address: u8, vendor_id: u16, product_id: u16) -> Self {
        Self {
            bus_number,
            address,
            vendor_id,
            product_id,
        }
    }

    pub fn is(&self, identity: &DeviceIdentity) -> bool {
        identity.matches(self.vendor_id, self.product_id)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ControlRequest {
    pub(crate) request_type: u8,
    pub(crate) request: u8,
    pub(crate) value: u16,
    pub(crate) index: u16,
    pub(crate) length: u16,
    pub(crate) timeout: Duration,
}

impl ControlRequest {
    pub fn new(request_type: u8, request: u8, value: u16, index: u16, timeout: Duration) -> Self {
        Self {
            request_type,
            request,
            value,
            index,
            length: 0,
            timeout,
        }
    }

    pub fn direction(&self) -> Direction {
        // Bit 7 of bmRequestType carries the direction
        match self.request_type & 0x80 {
            0 => Direction::Out,
            _ => Direction::In,
        }
    }

    /// The 8 byte setup packet this request puts on the wire.
    pub fn setup_packet(&self) -> [u8; 8] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }

    pub fn request_type(&self) -> u8 {
        self.request_type
    }
    pub fn index(&self) -> u16 {
        self.index
    }
    pub fn length(&self) -> u16 {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn identity_matches_the_outlet() {
        assert!(DeviceIdentity::NET_POWER_8800.matches(0x067b, 0x2303));
        assert!(UsbDevice::new(1, 4, 0x067b, 0x2303).is(&DeviceIdentity::NET_POWER_8800));
    }

    #[test]
    fn identity_rejects_swapped_ids() {
        assert!(!DeviceIdentity::NET_POWER_8800.matches(0x2303, 0x067b));
    }

    proptest! {
        #[test]
        fn identity_rejects_every_other_pair(
            vendor_id in any::<u16>(),
            product_id in any::<u16>()
        ) {
            prop_assume!((vendor_id, product_id) != (VID_NETPOWER, PID_NETPOWER));
            prop_assert!(!DeviceIdentity::NET_POWER_8800.matches(vendor_id, product_id));
        }
    }

    #[test]
    fn direction_follows_request_type() {
        let timeout = Duration::from_millis(5000);
        assert_eq!(
            ControlRequest::new(0xc0, 1, 0x81, 0, timeout).direction(),
            Direction::In
        );
        assert_eq!(
            ControlRequest::new(0x40, 1, 0x01, 0xa0, timeout).direction(),
            Direction::Out
        );
    }

    #[test]
    fn setup_packet_is_little_endian() {
        let request = ControlRequest {
            length: 1,
            ..ControlRequest::new(0xc0, 0x01, 0x0081, 0x1234, Duration::from_secs(5))
        };
        assert_eq!(
            request.setup_packet(),
            [0xc0, 0x01, 0x81, 0x00, 0x34, 0x12, 0x01, 0x00]
        );
    }
}
