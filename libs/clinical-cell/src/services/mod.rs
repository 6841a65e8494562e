pub mod risk;
pub mod records;
pub mod terms;

pub use risk::assess_risk;
pub use records::RecordService;
pub use terms::TermService;
