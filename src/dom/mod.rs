pub mod locator;
pub mod snapshot;

pub use locator::FieldLocator;
pub use snapshot::{ElementKind, ElementRef, FormField, FormSnapshot, LabelNode, SelectOption};
