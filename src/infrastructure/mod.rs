// Only the WinRT backend drives the bluetooth stack outside of tests
#[cfg_attr(not(windows), allow(dead_code))]
pub mod bluetooth;
pub mod logging;
