//! Shared test utilities:
//! - Fake HTTP executors (no network)
//! - Agent/client wiring over an in-memory bus
//! - Common test data

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod executors;
pub mod harness;
pub mod test_data;

pub use executors::*;
pub use harness::*;
pub use test_data::*;
