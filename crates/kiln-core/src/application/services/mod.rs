//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "check this selection" or "install these plugins".

pub mod compatibility_service;
pub mod orchestrator;

pub use compatibility_service::CompatibilityService;
pub use orchestrator::{FailurePolicy, InstallRequest, InstallSettings, InstallationOrchestrator};
