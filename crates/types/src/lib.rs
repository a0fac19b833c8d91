pub mod envelope;
pub mod gateway;
pub mod outcome;
pub mod result;
pub mod signing;

pub use envelope::*;
pub use gateway::*;
pub use outcome::*;
pub use result::*;
pub use signing::*;

/// Fee floor per operation, in stroops
pub const BASE_FEE: u32 = 100;

/// Maximum number of operations a single transaction may carry
pub const MAX_OPERATIONS: usize = 100;
