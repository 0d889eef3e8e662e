use crate::color::Color;
use crate::palette::PalettePresenter;
use eframe::egui;

pub const SWATCH_SIZE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwatchAction {
    Copy(Color),
    Remove(i64),
}

fn to_color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgb(color.red, color.green, color.blue)
}

/// Light outline on dark swatches, dark outline on light ones; thicker
/// while hovered.
fn outline(color: Color, hovered: bool) -> egui::Stroke {
    let stroke_color = if color.is_dark() {
        egui::Color32::LIGHT_GRAY
    } else {
        egui::Color32::DARK_GRAY
    };
    egui::Stroke::new(if hovered { 2.0 } else { 1.0 }, stroke_color)
}

/// Draws the saved colours as a grid and returns what the user clicked.
pub fn show(ui: &mut egui::Ui, palette: &PalettePresenter) -> Vec<SwatchAction> {
    let mut actions = Vec::new();
    if palette.swatches().is_empty() {
        ui.weak("No colours saved yet. Pick one from the screen or the colour dialog.");
        return actions;
    }

    let last_column = palette.columns() - 1;
    egui::ScrollArea::vertical().show(ui, |ui| {
        egui::Grid::new("swatch_grid")
            .spacing([3.0, 3.0])
            .show(ui, |ui| {
                for (index, saved) in palette.swatches().iter().enumerate() {
                    let hex = saved.color.hex_code();
                    ui.vertical_centered(|ui| {
                        let (rect, response) = ui.allocate_exact_size(
                            egui::vec2(SWATCH_SIZE, SWATCH_SIZE),
                            egui::Sense::click(),
                        );
                        ui.painter().rect_filled(rect, 4.0, to_color32(saved.color));
                        ui.painter()
                            .rect_stroke(rect, 4.0, outline(saved.color, response.hovered()));
                        let response = response.on_hover_text(&hex);
                        response.context_menu(|ui| {
                            if ui.button("Copy").clicked() {
                                actions.push(SwatchAction::Copy(saved.color));
                                ui.close_menu();
                            }
                            if ui.button("Remove").clicked() {
                                actions.push(SwatchAction::Remove(saved.id));
                                ui.close_menu();
                            }
                        });
                        ui.small(&hex);
                        if ui.small_button("Copy").clicked() {
                            actions.push(SwatchAction::Copy(saved.color));
                        }
                    });
                    if palette.grid_position(index).column == last_column {
                        ui.end_row();
                    }
                }
            });
    });
    actions
}
