//! Settings panel rendering for preview layout and limits.

use super::{UiApp, format_bytes};
use eframe::egui;

const MIB: u64 = 1024 * 1024;

impl UiApp {
    /// Renders the settings screen. Changes apply to this session only.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("Changes apply until the application is closed.");
        ui.add_space(12.0);

        ui.horizontal(|ui| {
            let slider = egui::Slider::new(&mut self.preview_style.max_width_fraction, 0.1..=1.0)
                .text("Preview width")
                .custom_formatter(|v, _| format!("{:.0}%", v * 100.0));
            ui.add(slider);
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Corner radius");
            ui.add(
                egui::DragValue::new(&mut self.preview_style.corner_radius)
                    .range(0..=40)
                    .speed(1),
            );
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Maximum image size (MiB)");
            let mut mib = (self.preview.max_bytes() / MIB).max(1);
            let resp = ui.add(egui::DragValue::new(&mut mib).range(1..=512).speed(1));
            if resp.changed() {
                self.preview.set_max_bytes(mib * MIB);
                self.status = format!(
                    "New size limit of {} applies to the next image",
                    format_bytes(mib * MIB)
                );
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Configuration");
        match &self.config_path {
            Some(path) => ui.label(format!("Config file: {}", path.display())),
            None => ui.label("Config file: built-in defaults"),
        };
        ui.label(format!("App version: {}", self.app_version));
    }
}
