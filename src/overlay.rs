// overlay.rs - label icons and names painted over the 3D scene with egui

use crate::labels::{Label, LabelPlacement};
use image::RgbaImage;
use std::collections::HashMap;

const LABEL_FONT_SIZE: f32 = 17.0;
const ICON_SCALE: f32 = 1.0 / 1.5;
const TEXT_NUDGE: f32 = 6.0;

#[derive(Default)]
pub struct LabelOverlay {
    icons: HashMap<String, egui::TextureHandle>,
}

impl LabelOverlay {
    /// Uploads decoded icons, replacing any from a previously opened map.
    pub fn install_icons(&mut self, ctx: &egui::Context, icons: HashMap<String, RgbaImage>) {
        self.icons.clear();
        for (kind, img) in icons {
            let size = [img.width() as usize, img.height() as usize];
            let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
            let handle = ctx.load_texture(format!("icon:{kind}"), color, egui::TextureOptions::LINEAR);
            self.icons.insert(kind, handle);
        }
        log::info!("{} label icons uploaded", self.icons.len());
    }

    /// Paints every visible label at its placement for this frame.
    pub fn draw(&self, ctx: &egui::Context, labels: &[Label], placements: &[LabelPlacement]) {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Background,
            egui::Id::new("map_labels"),
        ));
        // Placements are in physical pixels, egui works in points.
        let ppp = ctx.pixels_per_point();
        let font = egui::FontId::proportional(LABEL_FONT_SIZE);
        let hover = ctx.input(|i| i.pointer.hover_pos());
        let mut hovered: Option<&Label> = None;

        for (label, place) in labels.iter().zip(placements) {
            if !place.visible {
                continue;
            }
            let anchor = egui::pos2(place.x / ppp, place.y / ppp);
            let [r, g, b] = label.color;
            let color = egui::Color32::from_rgb(r, g, b);

            let icon = label.kind.as_deref().and_then(|k| self.icons.get(k));
            let text_top = match icon {
                Some(tex) => {
                    let size = tex.size_vec2() * ICON_SCALE;
                    let rect = egui::Rect::from_center_size(anchor, size);
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    painter.image(tex.id(), rect, uv, egui::Color32::WHITE);
                    anchor.y + size.y - TEXT_NUDGE
                }
                None => anchor.y - TEXT_NUDGE,
            };

            if label.name.is_empty() {
                continue;
            }
            let pos = egui::pos2(anchor.x, text_top);
            painter.text(
                pos + egui::vec2(1.0, 1.0),
                egui::Align2::CENTER_TOP,
                &label.name,
                font.clone(),
                egui::Color32::from_black_alpha(160),
            );
            let rect = painter.text(pos, egui::Align2::CENTER_TOP, &label.name, font.clone(), color);
            if hover.is_some_and(|p| rect.contains(p)) {
                hovered = Some(label);
            }
        }

        if let Some(text) = hovered.and_then(Label::tooltip) {
            egui::show_tooltip_at_pointer(ctx, egui::Id::new("map_label_tip"), |ui| {
                ui.label(text);
            });
        }
    }
}
