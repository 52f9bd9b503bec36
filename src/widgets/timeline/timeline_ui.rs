//! Timeline - UI rendering
//!
//! Layout, top to bottom:
//! - resize handle (drag to change pane height)
//! - toolbar: zoom, add frame, sequence name and summary
//! - frame strip: one thumbnail per frame, current frame highlighted
//! - editor for the current frame: duration slider, blur
//!
//! Geometry changes go straight into [`TimelineState`]; everything that
//! touches the sequence is dispatched as an event and applied by the app
//! loop (`main_events`).

use eframe::egui::{self, Color32, Rect, Sense, Stroke, Ui, Vec2};

use super::{DEFAULT_HEIGHT_PERCENT, TimelineState};
use super::timeline_events::{TimelineZoomInEvent, TimelineZoomOutEvent, TimelineZoomResetEvent};
use crate::core::event_bus::BoxedEvent;
use crate::core::frame_cache::{FrameCache, FrameImage};
use crate::core::player_events::{
    AddFrameEvent, MoveFrameEvent, RemoveFrameEvent, RenameSequenceEvent, SelectFrameEvent,
    SetFrameBlurEvent, SetFrameDurationEvent,
};
use crate::entities::frame::{FRAME_DURATION_STEP_MS, MAX_FRAME_DURATION_MS, MIN_FRAME_DURATION_MS};
use crate::entities::sequence::Sequence;

const HANDLE_HEIGHT: f32 = 6.0;
const MAX_BLUR: f32 = 20.0;

/// Drag handle on top of the pane. Opens a resize session on drag start,
/// follows the pointer while dragging and closes it on release.
/// Escape during a drag restores the height it started from; double-click
/// resets to the default height.
pub fn render_resize_handle(ui: &mut Ui, state: &mut TimelineState) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(
        Vec2::new(ui.available_width(), HANDLE_HEIGHT),
        Sense::click_and_drag(),
    );

    if response.drag_started() {
        state.begin_resize();
    }
    if response.dragged()
        && let Some(pos) = response.interact_pointer_pos()
    {
        let window_height = ui.ctx().input(|i| i.viewport_rect()).height();
        if state.drag_to(pos.y, window_height) {
            ui.ctx().request_repaint();
        }
    }
    if state.is_resizing() && ui.input(|i| i.key_pressed(egui::Key::Escape)) {
        state.cancel_resize();
        ui.ctx().request_repaint();
    }
    if response.drag_stopped() {
        state.end_resize();
    }
    if response.double_clicked() {
        state.set_height_percent(DEFAULT_HEIGHT_PERCENT);
    }

    if response.hovered() || state.is_resizing() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeVertical);
    }

    let color = if state.is_resizing() {
        ui.visuals().selection.bg_fill
    } else if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.noninteractive.bg_stroke.color
    };
    ui.painter().line_segment(
        [rect.left_center(), rect.right_center()],
        Stroke::new(2.0, color),
    );
    response
}

fn render_toolbar(ui: &mut Ui, sequence: &Sequence, state: &TimelineState, dispatch: &mut impl FnMut(BoxedEvent)) {
    ui.horizontal(|ui| {
        if ui.button("−").on_hover_text("Zoom Out (-)").clicked() {
            dispatch(Box::new(TimelineZoomOutEvent));
        }
        if ui
            .button(format!("{}%", state.zoom_percent()))
            .on_hover_text("Reset Zoom")
            .clicked()
        {
            dispatch(Box::new(TimelineZoomResetEvent));
        }
        if ui.button("+").on_hover_text("Zoom In (+)").clicked() {
            dispatch(Box::new(TimelineZoomInEvent));
        }

        ui.separator();

        if ui.button("➕ Add Frame").clicked() {
            dispatch(Box::new(AddFrameEvent { image_url: None }));
        }

        ui.separator();
        let mut name = sequence.name.clone();
        if ui
            .add(egui::TextEdit::singleline(&mut name).desired_width(120.0))
            .on_hover_text("Sequence name")
            .changed()
        {
            dispatch(Box::new(RenameSequenceEvent(name)));
        }
        ui.label(format!(
            "{} frames · {:.2}s",
            sequence.len(),
            sequence.total_duration_ms() as f64 / 1000.0
        ));
    });
}

fn paint_thumbnail(ui: &Ui, rect: Rect, image: &FrameImage) {
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);
    match image {
        FrameImage::Ready(texture) => {
            let size = texture.size_vec2();
            let scale = (rect.width() / size.x).min(rect.height() / size.y);
            let fitted = Rect::from_center_size(rect.center(), size * scale);
            let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), fitted, uv, Color32::WHITE);
        }
        FrameImage::Loading => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "…",
                egui::FontId::proportional(14.0),
                ui.visuals().weak_text_color(),
            );
        }
        FrameImage::Failed(_) => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "⚠",
                egui::FontId::proportional(18.0),
                ui.visuals().warn_fg_color,
            );
        }
    }
}

fn render_strip(
    ui: &mut Ui,
    sequence: &Sequence,
    state: &TimelineState,
    cache: &mut FrameCache,
    dispatch: &mut impl FnMut(BoxedEvent),
) {
    if sequence.is_empty() {
        ui.weak("No frames. Add one from the toolbar or the library.");
        return;
    }

    let thumb = state.thumbnail_width();
    let current = sequence.current_index();
    let last = sequence.len() - 1;

    egui::ScrollArea::horizontal()
        .id_salt("timeline_strip")
        .auto_shrink([false, true])
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                for (idx, frame) in sequence.frames().iter().enumerate() {
                    ui.vertical(|ui| {
                        ui.set_width(thumb);
                        let (rect, response) = ui.allocate_exact_size(Vec2::splat(thumb), Sense::click());
                        paint_thumbnail(ui, rect, &cache.image_for(frame));

                        let stroke = if idx == current {
                            Stroke::new(2.0, ui.visuals().selection.stroke.color)
                        } else if response.hovered() {
                            ui.visuals().widgets.hovered.bg_stroke
                        } else {
                            Stroke::NONE
                        };
                        ui.painter()
                            .rect_stroke(rect, 4.0, stroke, egui::StrokeKind::Inside);

                        if response.clicked() {
                            dispatch(Box::new(SelectFrameEvent(idx)));
                        }
                        response.on_hover_text(&frame.image_url);

                        ui.horizontal(|ui| {
                            ui.small(format!("{} · {}ms", idx + 1, frame.duration_ms()));
                        });
                        ui.horizontal(|ui| {
                            if ui.add_enabled(idx > 0, egui::Button::new("◀").small()).clicked() {
                                dispatch(Box::new(MoveFrameEvent { from: idx, to: idx - 1 }));
                            }
                            if ui.add_enabled(idx < last, egui::Button::new("▶").small()).clicked() {
                                dispatch(Box::new(MoveFrameEvent { from: idx, to: idx + 1 }));
                            }
                            if ui.small_button("✕").on_hover_text("Remove Frame").clicked() {
                                dispatch(Box::new(RemoveFrameEvent(idx)));
                            }
                        });
                    });
                }
            });
        });
}

fn render_frame_editor(ui: &mut Ui, sequence: &Sequence, dispatch: &mut impl FnMut(BoxedEvent)) {
    let Some(frame) = sequence.current_frame() else {
        return;
    };
    let index = sequence.current_index();

    ui.horizontal(|ui| {
        ui.label(format!("Frame {}:", index + 1));

        let mut duration = frame.duration_ms();
        let response = ui.add(
            egui::Slider::new(&mut duration, MIN_FRAME_DURATION_MS..=MAX_FRAME_DURATION_MS)
                .step_by(FRAME_DURATION_STEP_MS as f64)
                .suffix(" ms")
                .text("Duration"),
        );
        if response.changed() {
            dispatch(Box::new(SetFrameDurationEvent {
                index,
                duration_ms: duration as i64,
            }));
        }

        ui.separator();

        let mut blur = frame.blur().unwrap_or(0.0);
        let response = ui.add(
            egui::Slider::new(&mut blur, 0.0..=MAX_BLUR)
                .step_by(0.5)
                .suffix(" px")
                .text("Blur"),
        );
        if response.changed() {
            dispatch(Box::new(SetFrameBlurEvent { index, blur }));
        }
    });
}

/// Render the timeline pane contents (below the resize handle).
pub fn render_timeline(
    ui: &mut Ui,
    sequence: &Sequence,
    state: &TimelineState,
    cache: &mut FrameCache,
    mut dispatch: impl FnMut(BoxedEvent),
) {
    render_toolbar(ui, sequence, state, &mut dispatch);
    ui.separator();
    render_frame_editor(ui, sequence, &mut dispatch);
    ui.add_space(4.0);
    render_strip(ui, sequence, state, cache, &mut dispatch);
}
