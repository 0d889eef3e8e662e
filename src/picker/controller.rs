use crate::color::Color;
use crate::error::{HookRegistrationFault, SampleError, StoreFault};
use crate::hotkey::{Chord, Key};
use crate::picker::geometry::{virtual_desktop_bounds, ScreenGeometry};
use crate::picker::hook::InputHook;
use crate::picker::monitor::{HotkeyMonitor, MonitorEvent};
use crate::picker::sampler::PixelSampler;
use crate::store::{lock_store, SavedColor, SharedStore};
use std::time::{Duration, Instant};

pub const DEFAULT_PREVIEW_INTERVAL: Duration = Duration::from_millis(30);
/// Distance between the cursor and the colour-code label.
pub const LABEL_OFFSET: i32 = 15;
/// Vertical gap between the colour-code label and the instruction label.
pub const INSTRUCTION_GAP: i32 = 5;

const DEFAULT_LABEL_SIZE: (i32, i32) = (72, 22);
const DEFAULT_INSTRUCTION_SIZE: (i32, i32) = (196, 18);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingState {
    Disabled,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingConfig {
    pub chord: Chord,
    pub cancel_key: Option<Key>,
    pub preview_interval: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            chord: Chord::default(),
            cancel_key: Some(Key::Escape),
            preview_interval: DEFAULT_PREVIEW_INTERVAL,
        }
    }
}

impl SamplingConfig {
    pub fn instruction_text(&self) -> String {
        match self.cancel_key {
            Some(cancel) => format!("({} to Pick / {} to Cancel)", self.chord, cancel),
            None => format!("({} to Pick)", self.chord),
        }
    }
}

/// Outcome of one [`SamplingController::tick`] worth reporting to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingEvent {
    Committed(SavedColor),
    /// The commit position was off every display or the capture failed.
    CommitSkipped,
    StoreFailed(StoreFault),
    /// The cancel key ended the session.
    Cancelled,
}

/// Fixed-interval timer polled from the UI loop. The first poll after
/// `start` fires immediately.
#[derive(Debug, Clone)]
pub struct PreviewTimer {
    interval: Duration,
    running: bool,
    last_fired: Option<Instant>,
}

impl PreviewTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_fired = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_fired = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns true when a tick is due at `now`, and records it.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        let due = match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_fired = Some(now);
        }
        due
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPlacement {
    pub label: ScreenGeometry,
    pub instruction: ScreenGeometry,
}

/// Places the colour-code label 15 px below-right of the cursor, flipping
/// to the left and/or above when it would cross the surface's right or
/// bottom edge. The instruction label sits 5 px under the colour label.
/// All coordinates are surface-local.
pub fn place_labels(
    cursor: (i32, i32),
    label_size: (i32, i32),
    instruction_size: (i32, i32),
    surface_size: (i32, i32),
) -> LabelPlacement {
    let (cx, cy) = cursor;
    let (lw, lh) = label_size;

    let x = if cx + LABEL_OFFSET + lw > surface_size.0 {
        cx - lw - LABEL_OFFSET
    } else {
        cx + LABEL_OFFSET
    };
    let y = if cy + LABEL_OFFSET + lh > surface_size.1 {
        cy - lh - LABEL_OFFSET
    } else {
        cy + LABEL_OFFSET
    };

    LabelPlacement {
        label: ScreenGeometry::new(x, y, lw, lh),
        instruction: ScreenGeometry::new(
            x,
            y + lh + INSTRUCTION_GAP,
            instruction_size.0,
            instruction_size.1,
        ),
    }
}

/// What the overlay surface should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub visible: bool,
    /// Virtual desktop area the overlay spans.
    pub bounds: Option<ScreenGeometry>,
    pub label_text: Option<String>,
    pub instruction_text: String,
    pub placement: Option<LabelPlacement>,
    pub preview: Option<Color>,
}

#[derive(Debug, Default)]
struct OverlayState {
    bounds: Option<ScreenGeometry>,
    preview: Option<Color>,
    cursor: Option<(i32, i32)>,
}

pub type HookFactory = Box<dyn FnMut() -> Box<dyn InputHook>>;

/// Drives a screen sampling session from the UI thread.
///
/// `enable` starts the hotkey monitor and the preview timer; `tick` must be
/// called regularly from the UI loop and is the only place monitor events
/// are consumed, so store writes and overlay updates always happen on the
/// caller's thread.
pub struct SamplingController {
    sampler: PixelSampler,
    store: SharedStore,
    hook_factory: HookFactory,
    config: SamplingConfig,
    state: SamplingState,
    timer: PreviewTimer,
    monitor: Option<HotkeyMonitor>,
    overlay: OverlayState,
    label_size: (i32, i32),
    instruction_size: (i32, i32),
    last_committed: Option<SavedColor>,
    /// Last preview capture fault, logged once until it changes or clears.
    preview_fault: Option<String>,
}

impl SamplingController {
    pub fn new(
        sampler: PixelSampler,
        store: SharedStore,
        hook_factory: HookFactory,
        config: SamplingConfig,
    ) -> Self {
        let timer = PreviewTimer::new(config.preview_interval);
        Self {
            sampler,
            store,
            hook_factory,
            config,
            state: SamplingState::Disabled,
            timer,
            monitor: None,
            overlay: OverlayState::default(),
            label_size: DEFAULT_LABEL_SIZE,
            instruction_size: DEFAULT_INSTRUCTION_SIZE,
            last_committed: None,
            preview_fault: None,
        }
    }

    pub fn state(&self) -> SamplingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SamplingState::Active
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    pub fn preview_interval(&self) -> Duration {
        self.timer.interval()
    }

    pub fn sampler(&self) -> &PixelSampler {
        &self.sampler
    }

    pub fn last_committed(&self) -> Option<SavedColor> {
        self.last_committed
    }

    /// Capture fault hit by the most recent preview, if it is still failing.
    pub fn preview_fault(&self) -> Option<&str> {
        self.preview_fault.as_deref()
    }

    /// Measured label sizes from the renderer, used for edge flipping.
    pub fn set_label_sizes(&mut self, label: (i32, i32), instruction: (i32, i32)) {
        self.label_size = label;
        self.instruction_size = instruction;
    }

    /// Starts a session. A no-op while already active. If the hook cannot
    /// be registered nothing is started and the fault is returned.
    pub fn enable(&mut self) -> Result<(), HookRegistrationFault> {
        if self.is_active() {
            return Ok(());
        }

        let hook = (self.hook_factory)();
        let monitor = HotkeyMonitor::start(
            hook,
            self.config.chord,
            self.config.cancel_key,
            self.sampler.display().clone(),
        )?;
        self.monitor = Some(monitor);

        self.overlay = OverlayState {
            bounds: self.desktop_bounds(),
            ..OverlayState::default()
        };
        self.timer.start();
        self.state = SamplingState::Active;
        tracing::info!("screen sampling enabled");
        Ok(())
    }

    /// Ends the session. Idempotent.
    pub fn disable(&mut self) {
        if self.teardown() {
            tracing::info!("screen sampling disabled");
        }
    }

    pub fn cancel(&mut self) {
        if self.teardown() {
            tracing::info!("screen sampling cancelled");
        }
    }

    fn teardown(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.timer.stop();
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.overlay = OverlayState::default();
        self.preview_fault = None;
        self.state = SamplingState::Disabled;
        true
    }

    /// Processes queued hotkey events in order, then refreshes the preview
    /// if the timer is due.
    pub fn tick(&mut self, now: Instant) -> Vec<SamplingEvent> {
        let mut events = Vec::new();
        if !self.is_active() {
            return events;
        }

        let pending = self
            .monitor
            .as_ref()
            .map(HotkeyMonitor::drain_events)
            .unwrap_or_default();
        for event in pending {
            match event {
                MonitorEvent::ColorCommitRequested { position } => {
                    events.push(self.commit_at(position));
                }
                MonitorEvent::CancelRequested => {
                    self.cancel();
                    events.push(SamplingEvent::Cancelled);
                    return events;
                }
            }
        }

        if self.timer.poll(now) {
            self.refresh_preview();
        }
        events
    }

    /// Samples afresh at `position` and saves the result.
    fn commit_at(&mut self, position: (i32, i32)) -> SamplingEvent {
        let color = match self.sampler.sample_at(position.0, position.1) {
            Ok(color) => color,
            Err(SampleError::OutOfBounds { x, y }) => {
                tracing::debug!(x, y, "commit outside every display ignored");
                return SamplingEvent::CommitSkipped;
            }
            Err(err @ SampleError::CaptureFault(_)) => {
                tracing::warn!(%err, "commit capture failed");
                return SamplingEvent::CommitSkipped;
            }
        };

        let saved = lock_store(&self.store).and_then(|mut store| store.insert(color));
        match saved {
            Ok(saved) => {
                self.last_committed = Some(saved);
                SamplingEvent::Committed(saved)
            }
            Err(fault) => {
                tracing::error!(%fault, "failed to save picked colour");
                SamplingEvent::StoreFailed(fault)
            }
        }
    }

    fn refresh_preview(&mut self) {
        let Some(cursor) = self.sampler.display().cursor_position() else {
            return;
        };
        match self.sampler.sample_at(cursor.0, cursor.1) {
            Ok(color) => {
                self.overlay.preview = Some(color);
                self.overlay.cursor = Some(cursor);
                if self.preview_fault.take().is_some() {
                    tracing::info!("preview capture recovered");
                }
            }
            Err(SampleError::OutOfBounds { x, y }) => {
                tracing::debug!(x, y, "preview cursor outside every display");
            }
            Err(SampleError::CaptureFault(message)) => {
                if self.preview_fault.as_deref() != Some(message.as_str()) {
                    tracing::warn!(fault = %message, "preview capture failed");
                    self.preview_fault = Some(message);
                }
            }
        }
    }

    fn desktop_bounds(&self) -> Option<ScreenGeometry> {
        match self.sampler.display().displays() {
            Ok(displays) => virtual_desktop_bounds(&displays),
            Err(err) => {
                tracing::warn!(%err, "could not enumerate displays for the overlay");
                None
            }
        }
    }

    pub fn overlay(&self) -> OverlayView {
        let visible = self.is_active();
        let placement = match (self.overlay.bounds, self.overlay.cursor) {
            (Some(bounds), Some(cursor)) if self.overlay.preview.is_some() => Some(place_labels(
                (cursor.0 - bounds.x, cursor.1 - bounds.y),
                self.label_size,
                self.instruction_size,
                bounds.size(),
            )),
            _ => None,
        };
        OverlayView {
            visible,
            bounds: self.overlay.bounds,
            label_text: self.overlay.preview.map(Color::hex_code),
            instruction_text: self.config.instruction_text(),
            placement,
            preview: self.overlay.preview,
        }
    }
}

impl Drop for SamplingController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_flips_at_both_edges() {
        let placement = place_labels((790, 590), (70, 20), (190, 16), (800, 600));
        assert_eq!(placement.label, ScreenGeometry::new(705, 555, 70, 20));
        assert!(placement.label.x + placement.label.width < 790);
        assert!(placement.label.y + placement.label.height < 590);
        assert_eq!(placement.instruction.origin(), (705, 580));
    }

    #[test]
    fn label_sits_lower_right_when_it_fits() {
        let placement = place_labels((100, 100), (70, 20), (190, 16), (800, 600));
        assert_eq!(placement.label.origin(), (115, 115));
        assert_eq!(placement.instruction.origin(), (115, 140));
    }

    #[test]
    fn edges_flip_independently() {
        let right = place_labels((790, 100), (70, 20), (190, 16), (800, 600));
        assert_eq!(right.label.origin(), (705, 115));

        let bottom = place_labels((100, 590), (70, 20), (190, 16), (800, 600));
        assert_eq!(bottom.label.origin(), (115, 555));
    }

    #[test]
    fn exact_fit_does_not_flip() {
        let placement = place_labels((715, 565), (70, 20), (190, 16), (800, 600));
        assert_eq!(placement.label.origin(), (730, 580));
    }

    #[test]
    fn timer_fires_immediately_then_at_interval() {
        let mut timer = PreviewTimer::new(Duration::from_millis(30));
        let t0 = Instant::now();
        assert!(!timer.poll(t0));

        timer.start();
        assert!(timer.poll(t0));
        assert!(!timer.poll(t0 + Duration::from_millis(10)));
        assert!(timer.poll(t0 + Duration::from_millis(30)));

        timer.stop();
        assert!(!timer.poll(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn instruction_text_reflects_the_configured_keys() {
        assert_eq!(
            SamplingConfig::default().instruction_text(),
            "(ALT+1 to Pick / ESC to Cancel)"
        );
        let config = SamplingConfig {
            cancel_key: None,
            ..SamplingConfig::default()
        };
        assert_eq!(config.instruction_text(), "(ALT+1 to Pick)");
    }
}
