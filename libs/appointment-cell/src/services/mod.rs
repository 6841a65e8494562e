pub mod booking;
pub mod conflict;
pub mod lifecycle;

pub use booking::AppointmentService;
pub use conflict::{find_conflict, overlaps, ConflictDetectionService};
pub use lifecycle::{valid_transitions, validate_status_transition, validate_window};
