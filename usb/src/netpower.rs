use crate::device::base::{
    ControlRequest, ControlTransport, DeviceIdentity, DeviceRegistry, UsbDevice,
};
use crate::error::{CommandError, ConnectError};
use log::{debug, info, warn};
use std::time::Duration;
use strum::Display;

pub const STATUS_ON: u16 = 0xa0;
pub const STATUS_OFF: u16 = 0x20;

const TIMEOUT: Duration = Duration::from_millis(5000);

// Vendor, Device recipient, In / Out respectively
const REQUEST_TYPE_READ: u8 = 0xc0;
const REQUEST_TYPE_WRITE: u8 = 0x40;

const REQUEST_POWER: u8 = 0x01;
const VALUE_READ_STATUS: u16 = 0x0081;
const VALUE_SET_POWER: u16 = 0x0001;

#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    /// Interprets the result of a status transfer. Only the 'on' code counts as on.
    pub fn from_status(status: usize) -> Self {
        PowerState::from(status == STATUS_ON as usize)
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        match on {
            true => PowerState::On,
            false => PowerState::Off,
        }
    }
}

/// A single opened USB Net Power 8800 outlet.
pub struct NetPower {
    device: UsbDevice,
    handle: Box<dyn ControlTransport>,
}

impl NetPower {
    /// Opens the first attached outlet the registry reports. Failures are handed back so nothing
    /// can be attempted against a device that isn't there, the caller decides how to report them.
    pub fn open(registry: &dyn DeviceRegistry) -> Result<Self, ConnectError> {
        let result = Self::locate(registry);
        if let Err(error) = &result {
            debug!("Device open failed: {}", error);
        }
        result
    }

    fn locate(registry: &dyn DeviceRegistry) -> Result<Self, ConnectError> {
        let device = registry
            .devices()
            .map_err(ConnectError::EnumerationFailed)?
            .into_iter()
            .find(|device| device.is(&DeviceIdentity::NET_POWER_8800))
            .ok_or(ConnectError::DeviceNotFound)?;

        let handle = registry
            .open(&device)
            .map_err(|source| ConnectError::OpenFailed {
                bus_number: device.bus_number,
                address: device.address,
                source,
            })?;

        info!(
            "Opened USB Net Power 8800 on bus {}, address {}",
            device.bus_number, device.address
        );
        Ok(Self { device, handle })
    }

    pub fn device(&self) -> &UsbDevice {
        &self.device
    }

    /// Sends the status request, and returns the raw transfer result.
    pub fn read_status(&mut self) -> Result<usize, CommandError> {
        let request =
            ControlRequest::new(REQUEST_TYPE_READ, REQUEST_POWER, VALUE_READ_STATUS, 0, TIMEOUT);
        Ok(self.handle.control_transfer(&request)?)
    }

    /// Returns true if the outlet is currently switched on.
    ///
    /// Anything other than the 'on' code, including a failed transfer, reads as off. The status
    /// request is known to be unreliable on real hardware, so an 'off' here may just mean the
    /// device didn't answer.
    pub fn query_power(&mut self) -> bool {
        match self.read_status() {
            Ok(status) => {
                debug!("Status Transfer returned {:#04x}", status);
                PowerState::from_status(status) == PowerState::On
            }
            Err(error) => {
                warn!("Unable to read power state, assuming off: {}", error);
                false
            }
        }
    }

    pub fn power_state(&mut self) -> PowerState {
        PowerState::from(self.query_power())
    }

    /// Switches the outlet, returning the raw transfer result. The state is not read back.
    pub fn set_power(&mut self, on: bool) -> Result<usize, CommandError> {
        debug!("Switching outlet {}", PowerState::from(on));

        let code = match on {
            true => STATUS_ON,
            false => STATUS_OFF,
        };
        let request =
            ControlRequest::new(REQUEST_TYPE_WRITE, REQUEST_POWER, VALUE_SET_POWER, code, TIMEOUT);
        Ok(self.handle.control_transfer(&request)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockRegistry;
    use crate::{PID_NETPOWER, VID_NETPOWER};
    use pretty_assertions::assert_eq;

    fn open(registry: &MockRegistry) -> NetPower {
        NetPower::open(registry).expect("outlet should open")
    }

    #[test]
    fn open_picks_first_matching_device() {
        let registry = MockRegistry::new()
            .with_device(UsbDevice::new(1, 2, 0x1220, 0x8fe0))
            .with_device(UsbDevice::new(2, 7, VID_NETPOWER, PID_NETPOWER))
            .with_device(UsbDevice::new(3, 9, VID_NETPOWER, PID_NETPOWER));

        let netpower = open(&registry);
        assert_eq!(netpower.device(), &UsbDevice::new(2, 7, VID_NETPOWER, PID_NETPOWER));
        assert_eq!(registry.opened().len(), 1);
    }

    #[test]
    fn open_without_outlet_is_not_found() {
        let registry = MockRegistry::new().with_device(UsbDevice::new(1, 2, VID_NETPOWER, 0x2304));

        let result = NetPower::open(&registry);
        assert!(matches!(result, Err(ConnectError::DeviceNotFound)));
        assert!(registry.opened().is_empty());
    }

    #[test]
    fn open_reports_enumeration_failure() {
        let registry = MockRegistry::with_outlet().with_enumerate_error(rusb::Error::NoMem);

        let result = NetPower::open(&registry);
        assert!(matches!(
            result,
            Err(ConnectError::EnumerationFailed(rusb::Error::NoMem))
        ));
    }

    #[test]
    fn open_reports_access_failure() {
        let registry = MockRegistry::with_outlet().with_open_error(rusb::Error::Access);

        match NetPower::open(&registry) {
            Err(ConnectError::OpenFailed {
                bus_number,
                address,
                source,
            }) => {
                assert_eq!((bus_number, address), (1, 4));
                assert_eq!(source, rusb::Error::Access);
            }
            _ => panic!("expected an open failure"),
        }
    }

    #[test]
    fn set_power_on_sends_on_code() {
        let registry = MockRegistry::with_outlet();
        let mut netpower = open(&registry);

        assert_eq!(netpower.set_power(true).unwrap(), 0);

        let transfers = registry.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(
            transfers[0],
            ControlRequest::new(0x40, 0x01, 0x0001, 0xa0, Duration::from_millis(5000))
        );
    }

    #[test]
    fn set_power_off_sends_off_code() {
        let registry = MockRegistry::with_outlet();
        let mut netpower = open(&registry);

        netpower.set_power(false).unwrap();

        let transfers = registry.transfers();
        assert_eq!(
            transfers,
            vec![ControlRequest::new(0x40, 0x01, 0x0001, 0x20, Duration::from_millis(5000))]
        );
    }

    #[test]
    fn set_power_surfaces_transfer_errors() {
        let registry = MockRegistry::with_outlet().with_write_error(rusb::Error::Timeout);
        let mut netpower = open(&registry);

        let result = netpower.set_power(true);
        assert!(matches!(
            result,
            Err(CommandError::UsbError(rusb::Error::Timeout))
        ));
    }

    #[test]
    fn query_power_sends_status_request() {
        let registry = MockRegistry::with_outlet();
        let mut netpower = open(&registry);

        netpower.query_power();

        let request = registry.transfers()[0];
        assert_eq!(
            request,
            ControlRequest::new(0xc0, 0x01, 0x0081, 0x0000, Duration::from_millis(5000))
        );
        assert_eq!(request.length(), 0);
    }

    #[test]
    fn query_power_is_on_only_for_on_code() {
        for (status, expected) in [
            (Ok(0xa0), true),
            (Ok(0x20), false),
            (Ok(0x00), false),
            (Ok(0xa1), false),
            (Ok(0x1a0), false),
            (Err(rusb::Error::Timeout), false),
            (Err(rusb::Error::Pipe), false),
        ] {
            let registry = MockRegistry::with_outlet().with_status(status);
            let mut netpower = open(&registry);
            assert_eq!(netpower.query_power(), expected, "status {:?}", status);
        }
    }

    #[test]
    fn read_status_exposes_raw_result() {
        let registry = MockRegistry::with_outlet().with_status(Err(rusb::Error::Io));
        let mut netpower = open(&registry);

        assert!(matches!(
            netpower.read_status(),
            Err(CommandError::UsbError(rusb::Error::Io))
        ));
    }

    #[test]
    fn set_power_twice_is_idempotent() {
        let once = MockRegistry::with_outlet();
        let mut netpower = open(&once);
        netpower.set_power(true).unwrap();
        let state_once = netpower.power_state();

        let twice = MockRegistry::with_outlet();
        let mut netpower = open(&twice);
        netpower.set_power(true).unwrap();
        netpower.set_power(true).unwrap();
        let state_twice = netpower.power_state();

        assert_eq!(state_once, PowerState::On);
        assert_eq!(state_once, state_twice);
        assert_eq!(once.is_powered(), twice.is_powered());
    }

    #[test]
    fn power_state_displays_lowercase() {
        assert_eq!(PowerState::On.to_string(), "on");
        assert_eq!(PowerState::Off.to_string(), "off");
        assert_eq!(PowerState::from(false), PowerState::Off);
    }

    #[test]
    fn power_state_from_status_code() {
        assert_eq!(PowerState::from_status(0xa0), PowerState::On);
        assert_eq!(PowerState::from_status(0x20), PowerState::Off);
        assert_eq!(PowerState::from_status(0x00), PowerState::Off);
    }
}
