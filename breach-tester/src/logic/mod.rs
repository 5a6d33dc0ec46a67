pub mod campaign;
pub mod checks;
pub mod playability;
pub mod reports;
pub mod seeds;

pub use campaign::{CampaignStep, run_campaign};
pub use checks::{CheckResult, LevelCheck, LogicTester, catalog_checks, find_check};
pub use playability::{
    PlayabilityAggregate, PlayabilityRecord, aggregate_playability,
    run_playability_analysis, validate_playability_targets,
};
pub use reports::TesterReport;
pub use seeds::resolve_seed_inputs;
