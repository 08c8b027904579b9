pub mod data;
pub mod error;
pub mod simulator;

pub use crate::data::*;
pub use crate::simulator::equation::{self, Equation};
pub use crate::simulator::{BmiCategory, ModelKind, SimulationOptions, Trajectory};
pub use error::BodyCompError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            reference::ReferenceCurves, AdultCohort, ChildCohort, ForcingBuilder, ForcingTable,
            Interpolation,
        };
    }
    pub mod simulator {
        pub use crate::simulator::{
            equation,
            equation::adult::{AdultConstants, AdultModel, Initialization},
            equation::child::{ChildIntake, ChildModel, ChildParameters, GeneralizedLogistic},
            equation::Equation,
            output::Series,
            BmiCategory, ModelKind, SimulationOptions, Trajectory,
        };
    }

    pub use crate::data::*;
    pub use crate::simulator::equation::{
        AdultModel, ChildIntake, ChildModel, Equation, GeneralizedLogistic, Initialization,
    };
    pub use crate::simulator::{BmiCategory, ModelKind, SimulationOptions, Trajectory};
    pub use crate::BodyCompError;
}
