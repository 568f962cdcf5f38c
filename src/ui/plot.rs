use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Stress-strain plot (central panel)
// ---------------------------------------------------------------------------

/// Render the stress-strain curves of the active selection.
pub fn stress_strain_plot(ui: &mut Ui, state: &AppState) {
    if state.cache.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Import an export to view curves  (File → Import export…)");
        });
        return;
    }

    let axis = &state.cache.config().axis;
    let (x_scale, y_scale) = (axis.x_scaling, axis.y_scaling);

    Plot::new("stress_strain_plot")
        .legend(Legend::default())
        .x_axis_label(format!("Strain [{}]", axis.x_unit))
        .y_axis_label(format!("Stress [{}]", axis.y_unit))
        .include_x(0.0)
        .include_y(0.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for entry in &state.curves {
                let points: PlotPoints = entry
                    .curve
                    .points()
                    .map(|(strain, stress)| [strain / x_scale, stress / y_scale])
                    .collect();

                let line = Line::new(points)
                    .name(&entry.label)
                    .color(state.colors.color_for(&entry.sample))
                    .width(1.5);

                plot_ui.line(line);
            }
        });
}
