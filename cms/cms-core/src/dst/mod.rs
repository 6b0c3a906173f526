//! DST - Deterministic Simulation Testing
//!
//! Simulated time and seeded fault injection shared by the in-memory stores.
//!
//! # Usage
//!
//! ```rust
//! use cms_core::dst::{FaultConfig, FaultInjector, FaultType, SimClock};
//!
//! let clock = SimClock::at_ms(1_000);
//! let faults = FaultInjector::builder(42)
//!     .with_fault(FaultConfig::new(FaultType::StoreWriteFail, 0.1))
//!     .build();
//! clock.advance_ms(500);
//! let _ = faults.should_inject(FaultType::StoreWriteFail);
//! ```

mod clock;
mod fault;

pub use clock::{Clock, SimClock, SystemClock};
pub use fault::{FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType};
