#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("No USB Net Power 8800 device was found")]
    DeviceNotFound,

    #[error("Unable to enumerate USB devices: {0}")]
    EnumerationFailed(rusb::Error),

    #[error("Unable to open device on bus {bus_number}, address {address}: {source}")]
    OpenFailed {
        bus_number: u8,
        address: u8,
        source: rusb::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("USB error: {0}")]
    UsbError(#[from] rusb::Error),
}
