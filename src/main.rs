mod app;
mod color;
mod state;
mod ui;

use std::path::Path;

use app::TenTackleApp;
use eframe::egui;

use tentackle::config::{Config, FontConfig, DEFAULT_CONFIG_FILE};

/// Apply the configured font to every text style.
fn apply_font(ctx: &egui::Context, font: &FontConfig) {
    let family = match font.family.to_ascii_lowercase().as_str() {
        "monospace" => egui::FontFamily::Monospace,
        _ => egui::FontFamily::Proportional,
    };
    ctx.style_mut(|style| {
        for font_id in style.text_styles.values_mut() {
            font_id.family = family.clone();
            font_id.size = font.size;
        }
    });
}

fn main() -> eframe::Result {
    env_logger::init();

    let config = Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TenTackle – Tensile Data Viewer",
        options,
        Box::new(move |cc| {
            apply_font(&cc.egui_ctx, &config.font);
            Ok(Box::new(TenTackleApp::new(config)))
        }),
    )
}
