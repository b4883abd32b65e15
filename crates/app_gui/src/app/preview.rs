//! Image upload panel with the inline preview.

use super::{UiApp, format_bytes};
use eframe::egui;
use ovascan_core::{PanelKind, PreviewArtifact, SelectedFile};
use rfd::FileDialog;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// GPU texture for the artifact currently in the preview container.
pub(super) struct PreviewTexture {
    generation: u64,
    texture: egui::TextureHandle,
}

/// Pixels were decoded on the preview worker; only the upload happens here.
fn load_preview_texture(ctx: &egui::Context, artifact: &PreviewArtifact) -> egui::TextureHandle {
    let pixels = &artifact.pixels;
    let size = [pixels.width as usize, pixels.height as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, &pixels.rgba);
    let name = format!("preview:{}", artifact.generation);
    ctx.load_texture(name, color, egui::TextureOptions::LINEAR)
}

impl UiApp {
    /// Keeps the texture in step with the preview handler's current artifact.
    pub(super) fn sync_preview_texture(&mut self, ctx: &egui::Context) {
        let Some(artifact) = self.preview.current() else {
            self.preview_texture = None;
            return;
        };
        if self
            .preview_texture
            .as_ref()
            .is_some_and(|t| t.generation == artifact.generation)
        {
            return;
        }
        self.preview_texture = Some(PreviewTexture {
            generation: artifact.generation,
            texture: load_preview_texture(ctx, artifact),
        });
    }

    /// Files dropped anywhere on the window go to the preview and bring its tab forward.
    pub(super) fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        let Some(path) = dropped else {
            return;
        };
        self.preview.on_change(Some(SelectedFile::new(path)));
        if matches!(self.tabs.active_panel().kind, PanelKind::ImageUpload) {
            return;
        }
        let click = self
            .tabs
            .panels()
            .iter()
            .find(|p| matches!(p.kind, PanelKind::ImageUpload))
            .and_then(|p| self.tabs.click_for_panel(&p.id));
        if let Some(click) = click
            && let Err(e) = self.tabs.open_tab(&click)
        {
            self.status = format!("Cannot open tab: {e}");
        }
    }

    pub(super) fn render_image_panel(&mut self, ui: &mut egui::Ui) {
        // Outer `Some` marks a change event; the inner option is the selection itself.
        let mut change = None;
        ui.horizontal(|ui| {
            if ui.button("Choose image...").clicked() {
                let picked = FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file();
                change = Some(picked.map(SelectedFile::new));
            }
            if let Some(pending) = self.preview.pending() {
                ui.spinner();
                ui.label(format!("Loading {}...", pending.name));
            }
        });
        ui.label(format!(
            "Or drop an image onto the window (max {}).",
            format_bytes(self.preview.max_bytes())
        ));

        if let Some(selection) = change {
            self.preview.on_change(selection);
        }

        if let Some(notice) = self.preview.notice() {
            let color = ui.visuals().warn_fg_color;
            ui.colored_label(color, notice);
        }

        ui.add_space(8.0);
        let texture = self.preview_texture.as_ref().map(|t| &t.texture);
        let (Some(artifact), Some(texture)) = (self.preview.current(), texture) else {
            ui.weak("No image selected");
            return;
        };
        let dims = artifact.dimensions();
        let (w, h) = self
            .preview_style
            .fitted_size(ui.available_width(), dims);
        ui.add(
            egui::Image::new(egui::load::SizedTexture::from_handle(texture))
                .fit_to_exact_size(egui::vec2(w, h))
                .corner_radius(self.preview_style.corner_radius),
        );
        ui.label(format!(
            "{} ({}, {}x{})",
            artifact.file_name,
            format_bytes(artifact.byte_len as u64),
            dims.0,
            dims.1
        ));
    }
}
