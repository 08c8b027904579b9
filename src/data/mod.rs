pub mod builder;
pub mod cohort;
pub mod forcing;
pub mod reference;

pub use builder::{ForcingBuilder, Interpolation};
pub use cohort::{AdultCohort, ChildCohort};
pub use forcing::{step_index, ForcingTable};
pub use reference::ReferenceCurves;
