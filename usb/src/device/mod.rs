pub mod base;
mod libusb;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Only libusb is used here, the outlet is a plain vendor device with no special driver on any
// platform, so there's no need to switch backends per OS.
pub use crate::device::libusb::device::LibUsbRegistry;
