pub mod cloner;
pub mod dependency;
pub mod enrollment;
pub mod offerings;
pub mod versions;

pub use cloner::{CloneStats, VersionCloner};
pub use dependency::{CascadeSummary, DependencyReport, DependencyResolver, EntityType};
pub use enrollment::EnrollmentLedger;
pub use offerings::{ColorMigrationStats, OfferingService};
pub use versions::VersionManager;
