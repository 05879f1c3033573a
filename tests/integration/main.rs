//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem through the
//! AppService against mock adapters. Everything runs on the host with no
//! real hardware.

mod controller_tests;
mod mock_hw;
mod store_tests;
mod ui_tests;
mod uplink_tests;
