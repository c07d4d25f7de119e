//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives the full lifecycle against
//! the scripted modem.  All tests run on the host (x86_64) with no real
//! hardware required.

mod lifecycle_tests;
mod mock_hw;
mod stage_tests;
