//! fc-core: shared foundation for the fasstcat rig controller.
//!
//! Contains:
//! - ids (valve identities and logical positions)
//! - units (uom SI time, finiteness guard, sleep conversion)
//! - timing (the `Sleeper` capability and a wall-clock timer)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod timing;
pub mod units;

pub use error::{FcError, FcResult};
pub use ids::*;
pub use timing::{Sleeper, ThreadSleeper, Timer};
pub use units::*;
