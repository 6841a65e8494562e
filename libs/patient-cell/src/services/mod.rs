pub mod patient;
pub mod validation;

pub use patient::PatientService;
pub use validation::{check_primary_specialties, parse_date_of_birth, validate_new_patient};
