//! Main window: tab bar, active panel and status line.

mod preview;
mod settings;

use eframe::{App, Frame, egui};
use ovascan_core::{AppConfig, FsReader, PanelKind, PreviewHandler, PreviewStyle, TabController};
use std::path::PathBuf;

use preview::PreviewTexture;

pub(crate) struct UiApp {
    tabs: TabController,
    preview: PreviewHandler<FsReader>,
    preview_style: PreviewStyle,
    preview_texture: Option<PreviewTexture>,
    config_path: Option<PathBuf>,
    app_version: &'static str,
    status: String,
}

impl UiApp {
    pub(crate) fn new(
        ctx: &egui::Context,
        config: AppConfig,
        config_path: Option<PathBuf>,
        tabs: TabController,
    ) -> Self {
        let repaint = ctx.clone();
        let preview = PreviewHandler::new(FsReader, config.preview.max_bytes)
            .with_waker(move || repaint.request_repaint());
        Self {
            tabs,
            preview,
            preview_style: config.preview.style,
            preview_texture: None,
            config_path,
            app_version: env!("OVASCAN_VERSION"),
            status: String::new(),
        }
    }

    fn render_tab_bar(&mut self, ui: &mut egui::Ui) {
        let mut clicked = None;
        ui.horizontal(|ui| {
            for selector in self.tabs.selectors() {
                let active = self.tabs.is_selector_active(&selector.id);
                if ui.selectable_label(active, &selector.label).clicked() {
                    clicked = self.tabs.click_for(&selector.id);
                }
            }
        });
        if let Some(click) = clicked
            && let Err(e) = self.tabs.open_tab(&click)
        {
            self.status = format!("Cannot open tab: {e}");
        }
    }

    fn render_active_panel(&mut self, ui: &mut egui::Ui) {
        let panel = self.tabs.active_panel().clone();
        ui.heading(&panel.label);
        ui.add_space(8.0);
        match &panel.kind {
            PanelKind::ImageUpload => self.render_image_panel(ui),
            PanelKind::Text { body } => {
                ui.label(body);
            }
            PanelKind::Settings => self.render_settings_panel(ui),
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.handle_dropped_files(ctx);
        self.preview.poll();
        self.sync_preview_texture(ctx);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            self.render_tab_bar(ui);
        });

        if !self.status.is_empty() {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(&self.status);
                    if ui.small_button("x").clicked() {
                        self.status.clear();
                    }
                });
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| self.render_active_panel(ui));
        });
    }
}

/// Human readable byte count.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
