use screen_swatch::gui::SwatchApp;
use screen_swatch::logging;
use screen_swatch::settings::{resolve_settings_path, Settings};

use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings_path = resolve_settings_path();
    let mut notices = SwatchApp::default_notice_board();
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        Err(err) => {
            notices.warning(format!("Using default settings: {err:#}"));
            Settings::default()
        }
    };

    logging::init(settings.debug_logging, settings.log_file.clone());
    tracing::info!(path = %settings_path.display(), "starting screen_swatch");

    let mut viewport = egui::ViewportBuilder::default()
        .with_title("Screen Swatch")
        .with_inner_size([520.0, 420.0])
        .with_min_inner_size([500.0, 400.0]);
    if settings.always_on_top {
        viewport = viewport.with_always_on_top();
    }
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app = SwatchApp::new(settings, settings_path, notices)?;
    eframe::run_native(
        "Screen Swatch",
        native_options,
        Box::new(move |_cc| Box::new(app)),
    )
    .map_err(|err| anyhow::anyhow!("failed to start window: {err}"))
}
