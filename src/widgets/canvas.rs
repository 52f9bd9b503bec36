//! Canvas - current frame preview with transport controls.

use eframe::egui::{self, Color32, Rect, Sense, Stroke, Ui, Vec2};

use crate::core::event_bus::BoxedEvent;
use crate::core::frame_cache::{FrameCache, FrameImage};
use crate::core::player::Player;
use crate::core::player_events::{
    StepBackwardEvent, StepForwardEvent, StopEvent, ToggleLoopEvent, TogglePlayPauseEvent,
};

fn render_transport(ui: &mut Ui, player: &Player, dispatch: &mut impl FnMut(BoxedEvent)) {
    let has_frames = !player.sequence().is_empty();
    ui.horizontal(|ui| {
        if ui.add_enabled(has_frames, egui::Button::new("■")).on_hover_text("Stop (Home)").clicked() {
            dispatch(Box::new(StopEvent));
        }
        if ui.add_enabled(has_frames, egui::Button::new("⏮")).on_hover_text("Previous (←)").clicked() {
            dispatch(Box::new(StepBackwardEvent));
        }
        let play_icon = if player.is_playing() { "⏸" } else { "▶" };
        if ui
            .add_enabled(has_frames, egui::Button::new(play_icon))
            .on_hover_text("Play/Pause (Space)")
            .clicked()
        {
            dispatch(Box::new(TogglePlayPauseEvent));
        }
        if ui.add_enabled(has_frames, egui::Button::new("⏭")).on_hover_text("Next (→)").clicked() {
            dispatch(Box::new(StepForwardEvent));
        }
        if ui
            .selectable_label(player.is_looping(), "🔁")
            .on_hover_text("Loop (L)")
            .clicked()
        {
            dispatch(Box::new(ToggleLoopEvent));
        }

        ui.separator();
        if has_frames {
            ui.label(format!(
                "Frame {} / {}",
                player.current_index() + 1,
                player.sequence().len()
            ));
        } else {
            ui.weak("Empty sequence");
        }
    });
}

/// Draw the current frame fitted into a `canvas_size` box, centered in the available area.
pub fn render_canvas(
    ui: &mut Ui,
    player: &Player,
    cache: &mut FrameCache,
    canvas_size: [u32; 2],
    mut dispatch: impl FnMut(BoxedEvent),
) {
    render_transport(ui, player, &mut dispatch);
    ui.separator();

    let avail = ui.available_size();
    let (area, _) = ui.allocate_exact_size(avail, Sense::hover());

    let canvas = Vec2::new(canvas_size[0].max(1) as f32, canvas_size[1].max(1) as f32);
    let scale = (area.width() / canvas.x).min(area.height() / canvas.y).min(1.0).max(0.0);
    let rect = Rect::from_center_size(area.center(), canvas * scale);

    let painter = ui.painter_at(area);
    painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color),
        egui::StrokeKind::Outside,
    );

    let Some(frame) = player.current_frame() else {
        return;
    };
    match cache.image_for(frame) {
        FrameImage::Ready(texture) => {
            let size = texture.size_vec2();
            let fit = (rect.width() / size.x).min(rect.height() / size.y);
            let image_rect = Rect::from_center_size(rect.center(), size * fit);
            let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), image_rect, uv, Color32::WHITE);
        }
        FrameImage::Loading => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Loading…",
                egui::FontId::proportional(16.0),
                ui.visuals().weak_text_color(),
            );
        }
        FrameImage::Failed(msg) => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("⚠ {}", frame.image_url),
                egui::FontId::proportional(14.0),
                ui.visuals().warn_fg_color,
            );
            log::trace!("Canvas frame unavailable: {}", msg);
        }
    }
}
