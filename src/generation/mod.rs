//! Follow-up generation: per-contact planning, request validation, and the run controller.

pub mod plan;
pub mod request;
pub mod run;

pub use plan::{plan_contact, ContactPlan, ContactPlanInput, PlanSettings};
pub use request::{GenerateRequest, GenerateResponse, RunParameters};
pub use run::{FollowUpGenerator, GenerationDeps};
