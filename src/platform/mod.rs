pub mod classify;
pub mod profiles;

pub use classify::{classify, PlatformKind};
pub use profiles::PlatformProfile;
