pub use rusb;
pub mod device;
pub mod error;
pub mod netpower;

// The Net Power 8800 enumerates as a Prolific PL2303 serial adapter, although none of the
// serial functionality is used, everything happens over vendor control transfers.
pub const VID_NETPOWER: u16 = 0x067b;
pub const PID_NETPOWER: u16 = 0x2303;
