use crate::color::Color;
use crate::error::SampleError;
use crate::picker::display::DisplayService;
use crate::picker::geometry::{DisplayInfo, ScreenGeometry};
use anyhow::{Context, Result};
use screenshots::Screen;

/// [`DisplayService`] backed by the real desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDisplay;

impl SystemDisplay {
    pub fn new() -> Self {
        Self
    }
}

fn capture_fault(err: impl std::fmt::Display) -> SampleError {
    SampleError::CaptureFault(err.to_string())
}

fn to_display_info(screen: &Screen) -> DisplayInfo {
    let info = &screen.display_info;
    DisplayInfo {
        id: info.id,
        geometry: ScreenGeometry::new(info.x, info.y, info.width as i32, info.height as i32),
        is_primary: info.is_primary,
    }
}

impl DisplayService for SystemDisplay {
    fn displays(&self) -> Result<Vec<DisplayInfo>, SampleError> {
        let screens = Screen::all().map_err(capture_fault)?;
        Ok(screens.iter().map(to_display_info).collect())
    }

    fn capture_pixel(&self, display: &DisplayInfo, local: (i32, i32)) -> Result<Color, SampleError> {
        let screens = Screen::all().map_err(capture_fault)?;
        let screen = screens
            .iter()
            .find(|screen| screen.display_info.id == display.id)
            .ok_or_else(|| SampleError::CaptureFault(format!("display {} is gone", display.id)))?;
        let image = screen
            .capture_area(local.0, local.1, 1, 1)
            .map_err(capture_fault)?;
        let pixel = image
            .get_pixel_checked(0, 0)
            .ok_or_else(|| SampleError::CaptureFault("capture returned no pixels".into()))?;
        let [red, green, blue, _] = pixel.0;
        Ok(Color::rgb(red, green, blue))
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        crate::picker::hook::cursor_position()
    }

    fn clipboard_text(&self) -> Result<String> {
        let mut cb = arboard::Clipboard::new().context("open clipboard")?;
        cb.get_text().context("read clipboard text")
    }

    fn set_clipboard_text(&self, text: &str) -> Result<()> {
        let mut cb = arboard::Clipboard::new().context("open clipboard")?;
        cb.set_text(text.to_string())
            .context("write clipboard text")
    }
}
