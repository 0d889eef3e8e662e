use crate::picker::controller::OverlayView;
use crate::picker::geometry::ScreenGeometry;
use eframe::egui;

const COLOR_LABEL_FONT: f32 = 12.0;
const COLOR_LABEL_PADDING: f32 = 5.0;
const INSTRUCTION_FONT: f32 = 10.0;
const INSTRUCTION_PADDING: f32 = 3.0;

fn overlay_viewport_id() -> egui::ViewportId {
    egui::ViewportId::from_hash_of("screen_swatch_overlay")
}

fn padded_size(ctx: &egui::Context, text: &str, font: f32, padding: f32) -> (i32, i32) {
    let galley = ctx.fonts(|fonts| {
        fonts.layout_no_wrap(
            text.to_owned(),
            egui::FontId::proportional(font),
            egui::Color32::WHITE,
        )
    });
    let ppp = ctx.pixels_per_point();
    let size = galley.size() + egui::vec2(padding * 2.0, padding * 2.0);
    ((size.x * ppp).ceil() as i32, (size.y * ppp).ceil() as i32)
}

/// Physical pixel sizes of the colour-code and instruction labels.
pub fn measure_labels(ctx: &egui::Context, instruction: &str) -> ((i32, i32), (i32, i32)) {
    (
        padded_size(ctx, "#WWWWWW", COLOR_LABEL_FONT, COLOR_LABEL_PADDING),
        padded_size(ctx, instruction, INSTRUCTION_FONT, INSTRUCTION_PADDING),
    )
}

fn to_points(rect: ScreenGeometry, ppp: f32) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.x as f32 / ppp, rect.y as f32 / ppp),
        egui::vec2(rect.width as f32 / ppp, rect.height as f32 / ppp),
    )
}

fn paint_label(painter: &egui::Painter, rect: egui::Rect, text: &str, font: f32, rounding: f32) {
    painter.rect_filled(
        rect,
        rounding,
        egui::Color32::from_rgba_unmultiplied(0, 0, 0, 180),
    );
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(font),
        egui::Color32::WHITE,
    );
}

/// Shows the click-through overlay spanning the virtual desktop. Nothing is
/// shown when the session is inactive or the layout is unknown.
pub fn show(ctx: &egui::Context, view: &OverlayView) {
    if !view.visible {
        return;
    }
    let Some(bounds) = view.bounds else {
        return;
    };

    let ppp = ctx.pixels_per_point();
    let builder = egui::ViewportBuilder::default()
        .with_title("Screen Swatch Overlay")
        .with_decorations(false)
        .with_transparent(true)
        .with_always_on_top()
        .with_mouse_passthrough(true)
        .with_taskbar(false)
        .with_position([bounds.x as f32 / ppp, bounds.y as f32 / ppp])
        .with_inner_size([bounds.width as f32 / ppp, bounds.height as f32 / ppp]);

    ctx.show_viewport_immediate(overlay_viewport_id(), builder, |ctx, _class| {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (Some(text), Some(placement)) = (&view.label_text, view.placement) else {
                    return;
                };
                let painter = ui.painter();
                let ppp = ctx.pixels_per_point();
                paint_label(
                    painter,
                    to_points(placement.label, ppp),
                    text,
                    COLOR_LABEL_FONT,
                    COLOR_LABEL_PADDING,
                );
                paint_label(
                    painter,
                    to_points(placement.instruction, ppp),
                    &view.instruction_text,
                    INSTRUCTION_FONT,
                    INSTRUCTION_PADDING,
                );
            });
    });
}
