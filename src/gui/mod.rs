mod notice_log_dialog;
mod overlay;
mod swatch_grid;

pub use notice_log_dialog::NoticeLogDialog;

use crate::color::Color;
use crate::notice::{NoticeBoard, NoticeKind, NOTICE_LOG_FILE};
use crate::palette::PalettePresenter;
use crate::picker::capture::SystemDisplay;
use crate::picker::controller::{SamplingController, SamplingEvent};
use crate::picker::display::DisplayService;
use crate::picker::hook::{InputHook, SystemInputHook};
use crate::picker::sampler::PixelSampler;
use crate::settings::{data_dir, Settings};
use crate::store::{ColorStore, SharedStore};
use crate::toggles::{AppToggles, SideEffect, TrayAction, TrayMenu};
use eframe::egui;
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use swatch_grid::SwatchAction;

const TOAST_SECONDS: f64 = 3.0;

fn toast_kind(kind: NoticeKind) -> ToastKind {
    match kind {
        NoticeKind::Info => ToastKind::Info,
        NoticeKind::Success => ToastKind::Success,
        NoticeKind::Warning => ToastKind::Warning,
        NoticeKind::Error => ToastKind::Error,
    }
}

/// Opens the configured store, falling back to an in-memory one so the
/// window still works when the database cannot be opened.
fn open_store(path: &std::path::Path, notices: &mut NoticeBoard) -> anyhow::Result<SharedStore> {
    match ColorStore::open(path) {
        Ok(store) => Ok(store.shared()),
        Err(fault) => {
            tracing::error!(%fault, path = %path.display(), "falling back to in-memory colour store");
            notices.error(format!("{fault}; colours will not be kept after exit"));
            Ok(ColorStore::open_in_memory()?.shared())
        }
    }
}

pub struct SwatchApp {
    settings: Settings,
    settings_path: PathBuf,
    display: Arc<dyn DisplayService>,
    controller: SamplingController,
    palette: PalettePresenter,
    toggles: AppToggles,
    notices: NoticeBoard,
    toasts: Toasts,
    notice_log: NoticeLogDialog,
    dialog_color: [u8; 3],
    palette_fault_reported: bool,
    applied_always_on_top: Option<bool>,
}

impl SwatchApp {
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        mut notices: NoticeBoard,
    ) -> anyhow::Result<Self> {
        let display: Arc<dyn DisplayService> = Arc::new(SystemDisplay::new());
        let store = open_store(&settings.database_path(), &mut notices)?;

        let sampler =
            PixelSampler::new(Arc::clone(&display)).with_capture_timeout(settings.capture_timeout());
        let controller = SamplingController::new(
            sampler,
            Arc::clone(&store),
            Box::new(|| Box::new(SystemInputHook::new()) as Box<dyn InputHook>),
            settings.sampling_config(),
        );
        let palette = PalettePresenter::new(store, settings.palette_columns());
        let toggles = AppToggles {
            always_on_top: settings.always_on_top,
            ..AppToggles::default()
        };
        let notice_log = NoticeLogDialog::new(notices.log_path().map(PathBuf::from));

        Ok(Self {
            settings,
            settings_path,
            display,
            controller,
            palette,
            toggles,
            notices,
            toasts: Toasts::new().anchor(egui::Align2::RIGHT_TOP, [10.0, 10.0]),
            notice_log,
            dialog_color: [0, 0, 0],
            palette_fault_reported: false,
            applied_always_on_top: None,
        })
    }

    /// Notice board whose log lives in the data directory.
    pub fn default_notice_board() -> NoticeBoard {
        NoticeBoard::new(Some(data_dir().join(NOTICE_LOG_FILE)))
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings.save(&self.settings_path) {
            tracing::warn!(?err, "failed to save settings");
            self.notices.warning(format!("Could not save settings: {err:#}"));
        }
    }

    fn run_side_effect(&mut self, ctx: &egui::Context, effect: SideEffect) {
        match effect {
            SideEffect::EnableSampling => {
                if let Err(fault) = self.controller.enable() {
                    self.notices.error(fault.to_string());
                }
            }
            SideEffect::DisableSampling => self.controller.disable(),
            SideEffect::SetAlwaysOnTop(on) => {
                self.settings.always_on_top = on;
                self.persist_settings();
            }
            SideEffect::ShowWindow => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
                ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
                ctx.send_viewport_cmd(egui::ViewportCommand::Maximized(false));
                ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
            }
            SideEffect::Quit => {
                self.controller.disable();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
        self.toggles.sync_sampling(self.controller.is_active());
    }

    fn apply_window_level(&mut self, ctx: &egui::Context) {
        if self.applied_always_on_top == Some(self.toggles.always_on_top) {
            return;
        }
        let level = if self.toggles.always_on_top {
            egui::WindowLevel::AlwaysOnTop
        } else {
            egui::WindowLevel::Normal
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(level));
        self.applied_always_on_top = Some(self.toggles.always_on_top);
    }

    fn handle_sampling_events(&mut self) {
        for event in self.controller.tick(Instant::now()) {
            match event {
                SamplingEvent::Committed(saved) => {
                    self.notices.success(format!("Saved {}", saved.color));
                }
                SamplingEvent::StoreFailed(fault) => self.notices.error(fault.to_string()),
                SamplingEvent::CommitSkipped | SamplingEvent::Cancelled => {}
            }
        }
        self.toggles.sync_sampling(self.controller.is_active());
    }

    fn refresh_palette(&mut self) {
        match self.palette.refresh() {
            Ok(_) => self.palette_fault_reported = false,
            Err(fault) => {
                if !self.palette_fault_reported {
                    tracing::error!(%fault, "failed to load saved colours");
                    self.notices.error(fault.to_string());
                    self.palette_fault_reported = true;
                }
            }
        }
    }

    fn run_swatch_action(&mut self, action: SwatchAction) {
        match action {
            SwatchAction::Copy(color) => {
                match self.palette.copy_hex(self.display.as_ref(), color) {
                    Ok(hex) => self.notices.info(format!("Copied {hex}")),
                    Err(err) => {
                        tracing::warn!(?err, "clipboard copy failed");
                        self.notices.warning(format!("{err:#}"));
                    }
                }
            }
            SwatchAction::Remove(id) => {
                if let Err(fault) = self.palette.remove(id) {
                    self.notices.error(fault.to_string());
                }
            }
        }
    }

    fn save_dialog_color(&mut self) {
        match self.palette.save(Color::from_array(self.dialog_color)) {
            Ok(saved) => self.notices.success(format!("Saved {}", saved.color)),
            Err(fault) => self.notices.error(fault.to_string()),
        }
    }

    fn paste_color(&mut self) {
        match self.palette.paste_from_clipboard(self.display.as_ref()) {
            Ok(saved) => self.notices.success(format!("Saved {}", saved.color)),
            Err(err) => self.notices.warning(format!("{err:#}")),
        }
    }

    fn show_notices(&mut self) {
        for notice in self.notices.drain() {
            self.toasts.add(Toast {
                text: notice.text.into(),
                kind: toast_kind(notice.kind),
                options: ToastOptions::default().duration_in_seconds(TOAST_SECONDS),
            });
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) -> Vec<TrayAction> {
        let mut tray_actions = Vec::new();
        let mut paste = false;
        let mut clear = false;
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Menu", |ui| {
                    for item in TrayMenu::items(&self.toggles) {
                        let clicked = match item.checked {
                            Some(mut checked) => ui.checkbox(&mut checked, item.label).clicked(),
                            None => ui.button(item.label).clicked(),
                        };
                        if clicked {
                            tray_actions.push(item.action);
                            ui.close_menu();
                        }
                    }
                });
                ui.menu_button("Palette", |ui| {
                    if ui.button("Paste Colour Code").clicked() {
                        paste = true;
                        ui.close_menu();
                    }
                    if ui.button("Clear Palette").clicked() {
                        clear = true;
                        ui.close_menu();
                    }
                    if ui.button("Notice Log").clicked() {
                        self.notice_log.open();
                        ui.close_menu();
                    }
                });
            });
        });
        if paste {
            self.paste_color();
        }
        if clear {
            if let Err(fault) = self.palette.clear() {
                self.notices.error(fault.to_string());
            }
        }
        tray_actions
    }
}

impl eframe::App for SwatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_sampling_events();
        self.refresh_palette();
        self.apply_window_level(ctx);

        let mut tray_actions = self.menu_bar(ctx);
        let mut swatch_actions = Vec::new();
        let mut save_dialog_color = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Screen Swatch");
            });
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("Pick Color");
                egui::color_picker::color_edit_button_srgb(ui, &mut self.dialog_color);
                if ui.button("Save").clicked() {
                    save_dialog_color = true;
                }
                if ui
                    .selectable_label(self.toggles.sampling, "Pick Color From Screen")
                    .clicked()
                {
                    tray_actions.push(TrayAction::ToggleSampling);
                }
                if ui
                    .selectable_label(self.toggles.always_on_top, "Always Stay On Top")
                    .clicked()
                {
                    tray_actions.push(TrayAction::ToggleAlwaysOnTop);
                }
            });
            if let Some(last) = self.controller.last_committed() {
                ui.label(format!("Last picked: {}", last.color));
            }
            ui.separator();
            swatch_actions = swatch_grid::show(ui, &self.palette);
        });

        if save_dialog_color {
            self.save_dialog_color();
        }
        for action in swatch_actions {
            self.run_swatch_action(action);
        }
        for action in tray_actions {
            let effect = self.toggles.apply(action);
            self.run_side_effect(ctx, effect);
        }

        if self.controller.is_active() {
            let (label, instruction) =
                overlay::measure_labels(ctx, &self.controller.config().instruction_text());
            self.controller.set_label_sizes(label, instruction);
            overlay::show(ctx, &self.controller.overlay());
            ctx.request_repaint_after(self.controller.preview_interval());
        }

        self.notice_log.ui(ctx);
        self.show_notices();
        self.toasts.show(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.controller.disable();
        tracing::info!("exiting");
    }
}
