pub mod color;
pub mod error;
pub mod hotkey;
pub mod logging;
pub mod notice;
pub mod palette;
pub mod picker;
pub mod settings;
pub mod store;
pub mod toggles;

#[cfg(feature = "desktop")]
pub mod gui;

pub use color::Color;
pub use error::{HookRegistrationFault, SampleError, StoreFault};
