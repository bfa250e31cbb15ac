//
// constants.rs
//
use std::os::raw::c_int;

// constants stolen from C headers
pub const AF_CAN: c_int = 29;
pub const PF_CAN: c_int = 29;
pub const CAN_RAW: c_int = 1;

// get timestamp in a struct timespec (ns accuracy)
pub const SIOCGSTAMPNS: c_int = 0x8907;

/// One past the highest valid classic CAN identifier (`[0, 2047]`).
pub const MAX_CAN_ID: u16 = 2048;

/// Default CAN bit-rate used by `Interface::up` when the caller doesn't
/// specify one.
pub const DEFAULT_BITRATE: u32 = 1_000_000;
