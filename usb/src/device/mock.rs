//! An in-memory stand-in for the host USB stack.
//!
//! By default the mocked outlet behaves like real hardware responding perfectly: writing the
//! 'on' code switches it on, and status reads return the code of the current state. Any part of
//! that can be overridden to script failures.

use crate::device::base::{ControlRequest, ControlTransport, DeviceRegistry, UsbDevice};
use crate::{PID_NETPOWER, VID_NETPOWER};
use rusb::Direction;
use std::cell::RefCell;
use std::rc::Rc;

const CODE_ON: usize = 0xa0;
const CODE_OFF: usize = 0x20;

#[derive(Debug, Default)]
struct MockState {
    enumerations: usize,
    opened: Vec<UsbDevice>,
    transfers: Vec<ControlRequest>,
    powered: bool,
}

#[derive(Debug, Default, Clone)]
pub struct MockRegistry {
    devices: Vec<UsbDevice>,
    enumerate_error: Option<rusb::Error>,
    open_error: Option<rusb::Error>,
    write_error: Option<rusb::Error>,
    status: Option<Result<usize, rusb::Error>>,

    state: Rc<RefCell<MockState>>,
}

impl MockRegistry {
    /// A registry with nothing attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a single outlet attached on bus 1, address 4.
    pub fn with_outlet() -> Self {
        Self::new().with_device(UsbDevice::new(1, 4, VID_NETPOWER, PID_NETPOWER))
    }

    pub fn with_device(mut self, device: UsbDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_enumerate_error(mut self, error: rusb::Error) -> Self {
        self.enumerate_error = Some(error);
        self
    }

    pub fn with_open_error(mut self, error: rusb::Error) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn with_write_error(mut self, error: rusb::Error) -> Self {
        self.write_error = Some(error);
        self
    }

    /// Forces every status read to return this result, regardless of the outlet state.
    pub fn with_status(mut self, status: Result<usize, rusb::Error>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn enumerations(&self) -> usize {
        self.state.borrow().enumerations
    }

    pub fn opened(&self) -> Vec<UsbDevice> {
        self.state.borrow().opened.clone()
    }

    pub fn transfers(&self) -> Vec<ControlRequest> {
        self.state.borrow().transfers.clone()
    }

    pub fn is_powered(&self) -> bool {
        self.state.borrow().powered
    }
}

impl DeviceRegistry for MockRegistry {
    fn devices(&self) -> Result<Vec<UsbDevice>, rusb::Error> {
        self.state.borrow_mut().enumerations += 1;
        if let Some(error) = self.enumerate_error {
            return Err(error);
        }
        Ok(self.devices.clone())
    }

    fn open(&self, device: &UsbDevice) -> Result<Box<dyn ControlTransport>, rusb::Error> {
        if let Some(error) = self.open_error {
            return Err(error);
        }
        if !self.devices.contains(device) {
            return Err(rusb::Error::NoDevice);
        }

        self.state.borrow_mut().opened.push(device.clone());
        Ok(Box::new(MockTransport {
            write_error: self.write_error,
            status: self.status,
            state: self.state.clone(),
        }))
    }
}

struct MockTransport {
    write_error: Option<rusb::Error>,
    status: Option<Result<usize, rusb::Error>>,
    state: Rc<RefCell<MockState>>,
}

impl ControlTransport for MockTransport {
    fn control_transfer(&mut self, request: &ControlRequest) -> Result<usize, rusb::Error> {
        let mut state = self.state.borrow_mut();
        state.transfers.push(*request);

        match request.direction() {
            Direction::In => match self.status {
                Some(status) => status,
                None if state.powered => Ok(CODE_ON),
                None => Ok(CODE_OFF),
            },
            Direction::Out => {
                if let Some(error) = self.write_error {
                    return Err(error);
                }
                match request.index as usize {
                    CODE_ON => state.powered = true,
                    CODE_OFF => state.powered = false,
                    _ => {}
                }
                Ok(0)
            }
        }
    }
}
