use crate::device::base::{ControlRequest, ControlTransport, DeviceRegistry, UsbDevice};
use log::{debug, trace};
use rusb::{Device, DeviceHandle, Direction, GlobalContext};

/// Device registry backed by libusb's global context.
#[derive(Debug, Default)]
pub struct LibUsbRegistry;

impl LibUsbRegistry {
    pub fn new() -> Self {
        Self
    }

    fn find_device(device: &UsbDevice) -> Result<Device<GlobalContext>, rusb::Error> {
        for usb_device in rusb::devices()?.iter() {
            if usb_device.bus_number() == device.bus_number
                && usb_device.address() == device.address
            {
                return Ok(usb_device);
            }
        }
        Err(rusb::Error::NoDevice)
    }
}

impl DeviceRegistry for LibUsbRegistry {
    fn devices(&self) -> Result<Vec<UsbDevice>, rusb::Error> {
        let mut found_devices: Vec<UsbDevice> = Vec::new();

        for device in rusb::devices()?.iter() {
            match device.device_descriptor() {
                Ok(descriptor) => found_devices.push(UsbDevice {
                    bus_number: device.bus_number(),
                    address: device.address(),
                    vendor_id: descriptor.vendor_id(),
                    product_id: descriptor.product_id(),
                }),
                Err(error) => {
                    debug!("Skipping {:?}, unable to read descriptor: {}", device, error);
                }
            }
        }

        Ok(found_devices)
    }

    fn open(&self, device: &UsbDevice) -> Result<Box<dyn ControlTransport>, rusb::Error> {
        let usb_device = LibUsbRegistry::find_device(device)?;
        let handle = usb_device.open()?;
        Ok(Box::new(LibUsbTransport { handle }))
    }
}

pub struct LibUsbTransport {
    handle: DeviceHandle<GlobalContext>,
}

impl ControlTransport for LibUsbTransport {
    fn control_transfer(&mut self, request: &ControlRequest) -> Result<usize, rusb::Error> {
        trace!("Control Transfer: {:02x?}", request.setup_packet());

        let mut buf = vec![0; request.length as usize];
        match request.direction() {
            Direction::In => self.handle.read_control(
                request.request_type,
                request.request,
                request.value,
                request.index,
                &mut buf,
                request.timeout,
            ),
            Direction::Out => self.handle.write_control(
                request.request_type,
                request.request,
                request.value,
                request.index,
                &buf,
                request.timeout,
            ),
        }
    }
}
