pub mod chart;
pub mod layout_store;

pub use chart::{latest_per_tooth, validate_finding, ChartService};
pub use layout_store::LayoutService;
