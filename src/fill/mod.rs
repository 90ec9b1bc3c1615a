pub mod dropdown;
pub mod inject;
pub mod orchestrator;

pub use dropdown::{classify_dropdown, DropdownDriver, DropdownKind, DropdownProbe};
pub use inject::{InjectOutcome, ValueInjector};
pub use orchestrator::{FieldOutcome, FieldReport, FillOrchestrator, FillState, PassReport};
