pub mod clinic;
pub mod specialties;

pub use clinic::ClinicService;
pub use specialties::SpecialtyService;
