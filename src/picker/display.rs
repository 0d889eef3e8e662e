use crate::color::Color;
use crate::error::SampleError;
use crate::picker::geometry::{DisplayInfo, ScreenGeometry};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Platform services the picker needs: display layout, pixel capture,
/// pointer position and clipboard text.
///
/// Implementations are shared between the UI thread, the capture worker and
/// the hotkey monitor thread, so they must be `Send + Sync`.
pub trait DisplayService: Send + Sync {
    /// Current display layout. Queried on every sample, never cached.
    fn displays(&self) -> Result<Vec<DisplayInfo>, SampleError>;

    /// Reads one pixel of `display` at display-local coordinates.
    fn capture_pixel(&self, display: &DisplayInfo, local: (i32, i32)) -> Result<Color, SampleError>;

    /// Absolute pointer position in virtual desktop coordinates.
    fn cursor_position(&self) -> Option<(i32, i32)>;

    fn clipboard_text(&self) -> Result<String>;

    fn set_clipboard_text(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct VirtualDisplay {
    info: DisplayInfo,
    fill: Color,
}

#[derive(Debug, Default)]
struct VirtualDesktopState {
    displays: Vec<VirtualDisplay>,
    pixels: HashMap<(i32, i32), Color>,
    cursor: Option<(i32, i32)>,
    clipboard: String,
    capture_fault: Option<String>,
    capture_delay: Option<Duration>,
    clipboard_fault: bool,
}

/// In-memory [`DisplayService`] with a scripted layout, used for headless
/// runs and tests.
#[derive(Debug, Default)]
pub struct VirtualDesktop {
    state: Mutex<VirtualDesktopState>,
    captures: AtomicUsize,
}

impl VirtualDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a display filled with a single colour. Ids follow insertion order.
    pub fn with_display(self, geometry: ScreenGeometry, is_primary: bool, fill: Color) -> Self {
        self.add_display(geometry, is_primary, fill);
        self
    }

    pub fn add_display(&self, geometry: ScreenGeometry, is_primary: bool, fill: Color) -> u32 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let id = state.displays.len() as u32 + 1;
        state.displays.push(VirtualDisplay {
            info: DisplayInfo {
                id,
                geometry,
                is_primary,
            },
            fill,
        });
        id
    }

    /// Simulates unplugging every display.
    pub fn clear_displays(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.displays.clear();
        }
    }

    /// Overrides the colour at a virtual desktop coordinate.
    pub fn set_pixel(&self, point: (i32, i32), color: Color) {
        if let Ok(mut state) = self.state.lock() {
            state.pixels.insert(point, color);
        }
    }

    pub fn set_cursor(&self, cursor: Option<(i32, i32)>) {
        if let Ok(mut state) = self.state.lock() {
            state.cursor = cursor;
        }
    }

    pub fn set_capture_fault(&self, fault: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.capture_fault = fault.map(str::to_string);
        }
    }

    pub fn set_capture_delay(&self, delay: Option<Duration>) {
        if let Ok(mut state) = self.state.lock() {
            state.capture_delay = delay;
        }
    }

    pub fn set_clipboard_fault(&self, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.clipboard_fault = failing;
        }
    }

    /// Number of `capture_pixel` calls served so far.
    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl DisplayService for VirtualDesktop {
    fn displays(&self) -> Result<Vec<DisplayInfo>, SampleError> {
        let state = self
            .state
            .lock()
            .map_err(|_| SampleError::CaptureFault("virtual desktop lock poisoned".into()))?;
        Ok(state.displays.iter().map(|display| display.info).collect())
    }

    fn capture_pixel(&self, display: &DisplayInfo, local: (i32, i32)) -> Result<Color, SampleError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = {
            let state = self
                .state
                .lock()
                .map_err(|_| SampleError::CaptureFault("virtual desktop lock poisoned".into()))?;
            let result = if let Some(fault) = &state.capture_fault {
                Err(SampleError::CaptureFault(fault.clone()))
            } else {
                let global = (local.0 + display.geometry.x, local.1 + display.geometry.y);
                state
                    .displays
                    .iter()
                    .find(|candidate| candidate.info.id == display.id)
                    .map(|candidate| {
                        state
                            .pixels
                            .get(&global)
                            .copied()
                            .unwrap_or(candidate.fill)
                    })
                    .ok_or_else(|| {
                        SampleError::CaptureFault(format!("display {} disappeared", display.id))
                    })
            };
            (state.capture_delay, result)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        result
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        self.state.lock().ok().and_then(|state| state.cursor)
    }

    fn clipboard_text(&self) -> Result<String> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("virtual desktop lock poisoned"))?;
        if state.clipboard_fault {
            return Err(anyhow!("clipboard unavailable"));
        }
        Ok(state.clipboard.clone())
    }

    fn set_clipboard_text(&self, text: &str) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("virtual desktop lock poisoned"))?;
        if state.clipboard_fault {
            return Err(anyhow!("clipboard unavailable"));
        }
        state.clipboard = text.to_string();
        Ok(())
    }
}
