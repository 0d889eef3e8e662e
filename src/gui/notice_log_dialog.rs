use crate::notice::read_last_lines;
use eframe::egui;
use std::path::PathBuf;

const VISIBLE_LINES: usize = 20;

#[derive(Default)]
pub struct NoticeLogDialog {
    pub open: bool,
    path: Option<PathBuf>,
    lines: Vec<String>,
}

impl NoticeLogDialog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            open: false,
            path,
            lines: Vec::new(),
        }
    }

    pub fn open(&mut self) {
        self.reload();
        self.open = true;
    }

    fn reload(&mut self) {
        self.lines = match &self.path {
            Some(path) => read_last_lines(path, VISIBLE_LINES),
            None => Vec::new(),
        };
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }
        let mut close = false;
        let mut refresh = false;
        egui::Window::new("Notice Log")
            .resizable(true)
            .default_size((360.0, 200.0))
            .open(&mut self.open)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.lines.is_empty() {
                        ui.weak("No notices yet.");
                    }
                    for line in &self.lines {
                        ui.label(line);
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Refresh").clicked() {
                        refresh = true;
                    }
                    if ui.button("Close").clicked() {
                        close = true;
                    }
                });
            });
        if refresh {
            self.reload();
        }
        if close {
            self.open = false;
        }
    }
}
