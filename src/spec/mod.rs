//! Build and profile specifications
//!
//! Both documents are YAML. Unknown fields are ignored; a malformed
//! document is a parse error, never a partial spec.

pub mod build;
pub mod profile;
pub mod resolver;
pub mod step;

pub use build::{
    BaseStage, BuildSpec, EnvironmentStage, PackageDocker, PackageStage, Phase, PlannedStep,
    Stage, DEFAULT_SPEC_FILE,
};
pub use profile::{ProfileSpec, DEFAULT_SHELL};
pub use resolver::{resolve_reference, ProfileLocation};
pub use step::{Step, StepOptions, DEFAULT_STEP_TIMEOUT_SECS};
