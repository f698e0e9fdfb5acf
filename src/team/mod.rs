pub mod cohort;
pub mod solver;

pub use cohort::{ClassAssignment, Cohort, CohortPlayer};
pub use solver::{build_teams, SlotPlacement, TeamSplit};
