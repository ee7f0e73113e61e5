//! Work priority allocation library
//!
//! Re-exports modules for use by binaries and tools.

pub mod assignment;
pub mod availability;
pub mod colony;
pub mod error;
pub mod fitness;
pub mod params;
pub mod persistence;
pub mod quantity;
pub mod session;
pub mod source;
pub mod table;
pub mod telemetry;
pub mod types;

pub use assignment::{AssignmentPlan, AssignmentReport, PlannedAssignment};
pub use colony::Colony;
pub use params::{AllocationParams, TierOrder};
pub use quantity::Quantity;
pub use session::{PrioritySession, RebuildReport};
pub use table::AllocationTable;
pub use types::{JobCategory, JobCategoryId, Passion, Priority, WorkerId};
