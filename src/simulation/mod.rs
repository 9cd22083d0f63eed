pub mod snapshot;
pub mod stats;
pub mod traffic;
pub mod vehicle;

pub use snapshot::*;
pub use stats::*;
pub use traffic::*;
pub use vehicle::*;
