pub mod browser;
pub mod core;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod feedback;
pub mod fill;
pub mod platform;
pub mod profile;
pub mod testing;

pub use browser::{ChromeBrowser, ChromePage};
pub use crate::core::{EngineConfig, PageDriver};
pub use dom::{ElementKind, ElementRef, FieldLocator, FormField, FormSnapshot};
pub use engine::{AutofillEngine, RunReport};
pub use errors::{AutofillError, Result};
pub use feedback::{FeedbackPanel, ToastTone};
pub use fill::{
    DropdownDriver, DropdownKind, FieldOutcome, FillOrchestrator, FillState, InjectOutcome,
    PassReport, ValueInjector,
};
pub use platform::{classify, PlatformKind, PlatformProfile};
pub use profile::{FieldMappings, ProfileRecord};
