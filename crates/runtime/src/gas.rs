//! Gas schedule.

/// Reading a storage slot.
pub const LOAD: u64 = 200;
/// Writing or clearing a storage slot.
pub const STORE: u64 = 5_000;
/// Appending an event to the log.
pub const EMIT: u64 = 375;
/// Entering any call frame.
pub const CALL: u64 = 700;
/// Checking whether an address has code.
pub const CODE_CHECK: u64 = 100;
/// Deploying a new component.
pub const CREATE: u64 = 32_000;
