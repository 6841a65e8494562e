pub mod tooth;
pub mod layout;
pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use router::odontogram_routes;
pub use tooth::{Arch, Dentition, Surface, ToothId, ToothKind};
pub use services::{ChartService, LayoutService};
