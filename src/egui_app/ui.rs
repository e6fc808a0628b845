#![cfg(feature = "egui")]

use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, RichText, Sense};

use crate::camera::Gesture;
use crate::color::Rgb;
use crate::geometry::Point;
use crate::hit::{Hit, HitKind};
use crate::model::TrackState;
use crate::projection::CanvasSize;
use crate::render::{FrameKey, render_scene};
use crate::style::StyleStatus;

use super::painter::{ShapeCanvas, rgb_to_color32};
use super::state::TransitMapApp;

const BACKGROUND: Rgb = Rgb(245, 245, 240);

fn to_point(p: egui::Pos2, origin: egui::Pos2) -> Point {
    Point::new((p.x - origin.x) as f64, (p.y - origin.y) as f64)
}

fn describe(app: &TransitMapApp, hit: &Hit, ui: &mut egui::Ui) {
    match hit.kind {
        HitKind::Station => {
            ui.label(RichText::new(&hit.id).strong());
            if let Some(st) = app.scene.station(&hit.id) {
                let names: Vec<&str> = st
                    .lines
                    .iter()
                    .filter_map(|id| app.scene.config().line(id).map(|l| l.name.as_str()))
                    .collect();
                if !names.is_empty() {
                    ui.label(format!("Lines: {}", names.join(", ")));
                }
            }
        }
        HitKind::Train => {
            let Some(t) = app.scene.train(&hit.id) else { return };
            ui.label(RichText::new(t.name.as_deref().unwrap_or(&t.id)).strong());
            if let Some(line) = &t.line {
                ui.label(format!("Line: {line}"));
            }
            if let Some(speed) = t.speed {
                ui.label(format!("Speed: {speed:.1}"));
            }
        }
        HitKind::Signal => {
            if let Some(s) = app.scene.signal(&hit.id) {
                ui.label(RichText::new(format!("Signal {}", s.id)).strong());
                ui.label(format!("{:?}", s.state));
            }
        }
        HitKind::Track => {
            let Some(seg) = app.scene.segment(&hit.id) else { return };
            ui.label(RichText::new(format!("{} – {}", seg.from, seg.to)).strong());
            if let Some(label) = &seg.label {
                ui.label(label);
            }
            if seg.state != TrackState::Open {
                ui.label(format!("{:?}", seg.state));
            }
        }
    }
}

fn top_bar(app: &mut TransitMapApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Transit network").strong());
            ui.separator();
            let center = app.viewport.camera().canvas.center();
            if ui.small_button("−").clicked() {
                app.viewport.zoom_by(0.8, center);
            }
            if ui.small_button("+").clicked() {
                app.viewport.zoom_by(1.25, center);
            }
            if ui.small_button("Reset").clicked() {
                app.viewport.reset();
            }
            ui.label(format!("{}%", (app.viewport.zoom() * 100.0).round() as i64));
            ui.separator();
            ui.checkbox(&mut app.interpolate, "Smooth trains");
            ui.checkbox(&mut app.render_opts.show_labels, "Labels");
            if app.styles.admin_mode() {
                ui.separator();
                ui.label(RichText::new("Admin").color(Color32::from_rgb(0, 120, 255)));
                if app.styles.is_dirty() {
                    ui.label(RichText::new("unsaved styles").italics());
                }
            }
        });
        if let Some(banner) = app.poller.status().banner() {
            ui.colored_label(Color32::from_rgb(200, 120, 0), banner);
        }
        if let StyleStatus::Error(e) = app.styles.status() {
            ui.colored_label(Color32::RED, format!("Style service: {e}"));
        }
        if let Some(notice) = &app.notice {
            ui.label(notice);
        }
    });
}

fn style_editor(app: &mut TransitMapApp, ctx: &egui::Context) {
    if app.editor.is_none() || !app.styles.admin_mode() {
        return;
    }
    let mut apply = false;
    let mut remove = false;
    let mut save = false;
    let mut revert = false;
    let mut reset = false;
    let mut close = false;
    let busy = app.styles.is_busy();
    egui::SidePanel::right("style_editor").show(ctx, |ui| {
        let Some(draft) = app.editor.as_mut() else { return };
        ui.heading("Track style");
        ui.label(RichText::new(&draft.track_id).monospace());
        ui.separator();
        ui.horizontal(|ui| {
            apply |= ui.checkbox(&mut draft.use_color, "Color").changed();
            apply |= ui.color_edit_button_srgb(&mut draft.color).changed();
        });
        ui.horizontal(|ui| {
            apply |= ui.checkbox(&mut draft.use_width, "Width").changed();
            apply |= ui
                .add(egui::DragValue::new(&mut draft.width).range(0.5..=24.0).speed(0.1))
                .changed();
        });
        apply |= ui.checkbox(&mut draft.hidden, "Hidden").changed();
        ui.horizontal(|ui| {
            ui.label("Label");
            apply |= ui.text_edit_singleline(&mut draft.label).changed();
        });
        ui.separator();
        ui.add_enabled_ui(!busy, |ui| {
            ui.horizontal(|ui| {
                remove = ui.button("Remove override").clicked();
                close = ui.button("Close").clicked();
            });
            ui.horizontal(|ui| {
                save = ui.button("Save").clicked();
                revert = ui.button("Revert").clicked();
                reset = ui.button("Reset all").clicked();
            });
        });
        if busy {
            ui.spinner();
        }
    });
    if apply {
        app.apply_draft();
    }
    if remove {
        app.remove_override();
    }
    if save {
        app.save_styles();
    }
    if revert {
        app.revert_styles();
    }
    if reset {
        app.reset_styles();
    }
    if close {
        app.editor = None;
    }
}

fn map_canvas(app: &mut TransitMapApp, ui: &mut egui::Ui, now: Instant) {
    let rect = ui.available_rect_before_wrap();
    let resp = ui.allocate_rect(rect, Sense::click_and_drag());
    let origin = rect.min;
    app.viewport
        .set_canvas_size(CanvasSize::new(rect.width() as f64, rect.height() as f64));
    if app.canvas_origin != Some(origin) {
        app.canvas_origin = Some(origin);
        app.frame_gate.invalidate();
    }

    let trains = app.displayed_trains(now);

    if resp.drag_started() {
        if let Some(p) = resp.interact_pointer_pos() {
            app.viewport.pointer_down(to_point(p, origin));
        }
    }
    if resp.dragged() {
        if let Some(p) = resp.interact_pointer_pos() {
            app.viewport.pointer_move(to_point(p, origin));
        }
    }
    if resp.drag_stopped() {
        app.viewport.pointer_up();
    }
    let scroll_y = ui.input(|i| i.raw_scroll_delta.y);
    if scroll_y.abs() > 0.0 && resp.hovered() {
        let anchor = resp.hover_pos().unwrap_or(rect.center());
        app.viewport.wheel(scroll_y as f64, to_point(anchor, origin));
    }

    let hover_pos = resp.hover_pos().map(|p| to_point(p, origin));
    if app.viewport.gesture() != Gesture::Idle {
        app.hover = None;
    } else {
        app.pointer_hover(hover_pos, &trains);
    }
    if resp.double_clicked() {
        if let Some(p) = resp.interact_pointer_pos() {
            app.double_click(to_point(p, origin), &trains);
        }
    } else if resp.clicked() {
        if let Some(p) = resp.interact_pointer_pos() {
            app.click(to_point(p, origin), &trains);
        }
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, rgb_to_color32(BACKGROUND));

    let key = FrameKey {
        scene_revision: app.scene.revision(),
        camera_revision: app.viewport.revision(),
        hover: app.hover.clone(),
        selection: app.selection.clone(),
        anim_tick: app.anim_tick(now),
        show_labels: app.render_opts.show_labels,
    };
    if app.frame_gate.needs_redraw(&key) {
        let mut canvas = ShapeCanvas::new(&painter, origin);
        match render_scene(
            &mut canvas,
            &app.scene,
            &trains,
            app.viewport.camera(),
            app.hover.as_ref(),
            app.selection.as_ref(),
            &app.render_opts,
        ) {
            Ok(_) => {
                app.cached_shapes = canvas.shapes;
                app.frame_gate.mark_drawn(key);
            }
            Err(e) => {
                log::error!("cannot draw map: {e}");
                app.cached_shapes.clear();
                app.frame_gate.invalidate();
                ui.colored_label(Color32::RED, format!("Map unavailable: {e}"));
            }
        }
    }
    painter.extend(app.cached_shapes.iter().cloned());

    if app.scene.derived_segments().is_empty() && app.scene.trains().is_empty() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Waiting for network data…",
            egui::FontId::proportional(16.0),
            Color32::GRAY,
        );
    }

    if let Some(hit) = app.hover.clone() {
        resp.on_hover_ui_at_pointer(|ui| describe(app, &hit, ui));
    }
}

/// Main per-frame entry point.
pub fn update(app: &mut TransitMapApp, ctx: &egui::Context) {
    let now = Instant::now();
    if app.sync(now) {
        ctx.request_repaint();
    }
    top_bar(app, ctx);
    style_editor(app, ctx);
    if let Some(sel) = app.selection.clone().filter(|_| app.editor.is_none()) {
        egui::SidePanel::right("selection").show(ctx, |ui| {
            describe(app, &sel, ui);
        });
    }
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| map_canvas(app, ui, now));

    let wait = if app.interpolate {
        Duration::from_millis(16)
    } else if app.poller.is_in_flight() || app.styles.is_busy() {
        Duration::from_millis(100)
    } else {
        app.poller.time_until_due(now).max(Duration::from_millis(50))
    };
    ctx.request_repaint_after(wait);
}
