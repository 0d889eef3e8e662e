use crate::color::Color;
use crate::error::StoreFault;
use crate::picker::display::DisplayService;
use crate::store::{lock_store, SavedColor, SharedStore, StoreEvent};
use anyhow::{Context, Result};
use std::sync::mpsc::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPosition {
    pub row: usize,
    pub column: usize,
}

/// View model for the swatch grid. Holds a snapshot of the store that is
/// reloaded only after the store reports a change.
pub struct PalettePresenter {
    store: SharedStore,
    changes: Receiver<StoreEvent>,
    swatches: Vec<SavedColor>,
    columns: usize,
    stale: bool,
}

impl PalettePresenter {
    pub fn new(store: SharedStore, columns: usize) -> Self {
        let changes = match lock_store(&store) {
            Ok(mut guard) => guard.subscribe(),
            Err(fault) => {
                tracing::error!(%fault, "palette could not subscribe to store changes");
                std::sync::mpsc::channel().1
            }
        };
        Self {
            store,
            changes,
            swatches: Vec::new(),
            columns: columns.max(1),
            stale: true,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn swatches(&self) -> &[SavedColor] {
        &self.swatches
    }

    /// Reloads the snapshot if the store changed since the last call.
    /// Returns whether a reload happened. On failure the previous snapshot
    /// is kept and the reload is retried next time.
    pub fn refresh(&mut self) -> Result<bool, StoreFault> {
        let changed = self.changes.try_iter().count() > 0;
        if !changed && !self.stale {
            return Ok(false);
        }
        self.stale = true;
        let swatches = lock_store(&self.store)?.list_all()?;
        self.swatches = swatches;
        self.stale = false;
        Ok(true)
    }

    /// Row-major position of the swatch at `index`.
    pub fn grid_position(&self, index: usize) -> GridPosition {
        GridPosition {
            row: index / self.columns,
            column: index % self.columns,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[SavedColor]> {
        self.swatches.chunks(self.columns)
    }

    /// Writes `#RRGGBB` to the clipboard and returns the text written.
    pub fn copy_hex(&self, display: &dyn DisplayService, color: Color) -> Result<String> {
        let hex = color.hex_code();
        display
            .set_clipboard_text(&hex)
            .with_context(|| format!("copy {hex} to clipboard"))?;
        tracing::info!(hex = %hex, "copied colour code to clipboard");
        Ok(hex)
    }

    /// Saves a colour chosen outside the sampler, e.g. from the colour
    /// dialog. Duplicates are handled by the store.
    pub fn save(&self, color: Color) -> Result<SavedColor, StoreFault> {
        lock_store(&self.store)?.insert(color)
    }

    /// Saves the `#RRGGBB` code currently on the clipboard.
    pub fn paste_from_clipboard(&self, display: &dyn DisplayService) -> Result<SavedColor> {
        let text = display.clipboard_text().context("read clipboard")?;
        let color = Color::from_hex(&text)?;
        Ok(self.save(color)?)
    }

    pub fn remove(&self, id: i64) -> Result<(), StoreFault> {
        lock_store(&self.store)?.remove(id)
    }

    pub fn clear(&self) -> Result<(), StoreFault> {
        lock_store(&self.store)?.clear()
    }
}
