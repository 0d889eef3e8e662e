//! Screen colour sampling: display geometry, pixel capture, the global
//! commit hotkey and the overlay session that ties them together.

#[cfg(feature = "desktop")]
pub mod capture;
pub mod controller;
pub mod display;
pub mod geometry;
pub mod hook;
pub mod monitor;
pub mod sampler;

#[cfg(feature = "desktop")]
pub use capture::SystemDisplay;
pub use controller::{
    place_labels, HookFactory, LabelPlacement, OverlayView, PreviewTimer, SamplingConfig,
    SamplingController, SamplingEvent, SamplingState,
};
pub use display::{DisplayService, VirtualDesktop};
pub use geometry::{DisplayInfo, ScreenGeometry};
pub use hook::{ChannelHook, InputHook, InputInjector, InputSink, RawInput};
pub use monitor::{ChordTracker, HotkeyMonitor, MonitorEvent};
pub use sampler::PixelSampler;
