pub mod forms;
pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use forms::SpecialtyForm;
pub use models::*;
pub use router::clinical_routes;
pub use services::{assess_risk, RecordService, TermService};
