use std::collections::BTreeMap;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use tentackle::cache::RemovalScope;
use tentackle::data::{SampleRef, TableId};

use crate::state::AppState;

/// Selection edits collected while drawing, applied afterwards.
enum Action {
    Remove(TableId, RemovalScope),
    Truncate(SampleRef, u8),
}

// ---------------------------------------------------------------------------
// Left side panel – selection widgets
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Import");
    ui.separator();

    ui.label("Samples (empty = all):");
    ui.add(
        egui::TextEdit::singleline(&mut state.selection_input)
            .hint_text("1-1,2-1-80")
            .desired_width(f32::INFINITY),
    );
    if ui.button("Import export…").clicked() {
        import_file_dialog(state);
    }

    ui.add_space(8.0);
    ui.heading("Selection");
    ui.separator();

    let mut actions = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .max_height((ui.available_height() - 140.0).max(120.0))
        .show(ui, |ui: &mut Ui| {
            let samples = state.cache.active_samples();
            if samples.is_empty() {
                ui.label("Nothing selected.");
                return;
            }

            // Group samples per table, then per batch.
            let mut grouped: BTreeMap<TableId, Vec<_>> = BTreeMap::new();
            for sample in &samples {
                grouped.entry(sample.table.id()).or_default().push(sample);
            }

            for (table_id, members) in &grouped {
                let table = members[0].table;
                let header_text = format!(
                    "{}  ({} / {}×{}, {})",
                    table.name(),
                    members.len(),
                    table.batch_count(),
                    table.subbatch_count(),
                    table.variant()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(table_id.get())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.label(RichText::new(table.path().display().to_string()).small());
                        if ui.small_button("Remove table").clicked() {
                            actions.push(Action::Remove(*table_id, RemovalScope::Table));
                        }

                        let mut last_batch = None;
                        for sample in members {
                            let batch = sample.key.batch;
                            if last_batch != Some(batch) {
                                last_batch = Some(batch);
                                ui.horizontal(|ui: &mut Ui| {
                                    ui.strong(format!("Batch {batch}"));
                                    if ui.small_button("✕").on_hover_text("Remove batch").clicked() {
                                        actions.push(Action::Remove(
                                            *table_id,
                                            RemovalScope::Batch(batch),
                                        ));
                                    }
                                });
                            }

                            let sample_ref = sample.sample_ref();
                            let color = state.colors.color_for(&sample_ref);
                            ui.horizontal(|ui: &mut Ui| {
                                ui.label(RichText::new(sample.key.to_string()).color(color));

                                let mut pct = state
                                    .truncation_drafts
                                    .get(&sample_ref)
                                    .copied()
                                    .unwrap_or(100);
                                let response =
                                    ui.add(egui::Slider::new(&mut pct, 0..=100).suffix(" %"));
                                if response.changed() {
                                    state.truncation_drafts.insert(sample_ref, pct);
                                }
                                if response.drag_stopped()
                                    || (response.changed() && !response.dragged())
                                {
                                    actions.push(Action::Truncate(sample_ref, pct));
                                }

                                if ui.small_button("✕").on_hover_text("Remove sample").clicked() {
                                    actions.push(Action::Remove(
                                        *table_id,
                                        RemovalScope::Sample(batch, sample.key.subbatch),
                                    ));
                                }
                            });
                        }
                    });
            }
        });

    for action in actions {
        match action {
            Action::Remove(table, scope) => state.remove(table, scope),
            Action::Truncate(sample, pct) => state.commit_truncation(sample, pct),
        }
    }

    ui.separator();
    ui.strong("Notes");
    if ui
        .add(
            egui::TextEdit::multiline(&mut state.notes)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        )
        .changed()
    {
        state.cache.set_notes(state.notes.clone());
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Import export…").clicked() {
                import_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Open project…").clicked() {
                open_project_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save project").clicked() {
                save_project(state);
                ui.close_menu();
            }
            if ui.button("Save project as…").clicked() {
                save_project_as_dialog(state);
                ui.close_menu();
            }
            if ui.button("New project").clicked() {
                if confirm_discard(state) {
                    state.new_project();
                }
                ui.close_menu();
            }
        });

        ui.menu_button("Edit", |ui: &mut Ui| {
            if ui
                .add_enabled(state.cache.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                state.undo();
                ui.close_menu();
            }
            if ui
                .add_enabled(state.cache.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                state.redo();
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(!state.cache.is_empty(), egui::Button::new("Clear selection"))
                .clicked()
            {
                state.clear();
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "{} sample(s) from {} file(s)",
            state.cache.len(),
            state.cache.tables().count()
        ));

        if let Some(path) = state.cache.snapshot_path() {
            ui.separator();
            ui.label(path.display().to_string());
        }

        if state.cache.modified() {
            ui.label(RichText::new("● unsaved changes").color(Color32::YELLOW));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Keyboard shortcuts for the menu actions.
pub fn shortcuts(ctx: &egui::Context, state: &mut AppState) {
    use egui::{Key, KeyboardShortcut, Modifiers};

    let redo = KeyboardShortcut::new(Modifiers::COMMAND | Modifiers::SHIFT, Key::Z);
    let undo = KeyboardShortcut::new(Modifiers::COMMAND, Key::Z);
    let save = KeyboardShortcut::new(Modifiers::COMMAND, Key::S);

    // redo first: the undo shortcut also matches with shift held
    if ctx.input_mut(|i| i.consume_shortcut(&redo)) {
        state.redo();
    }
    if ctx.input_mut(|i| i.consume_shortcut(&undo)) {
        state.undo();
    }
    if ctx.input_mut(|i| i.consume_shortcut(&save)) {
        save_project(state);
    }
}

// ---------------------------------------------------------------------------
// Bottom panel – statistics
// ---------------------------------------------------------------------------

pub fn analysis_table(ui: &mut Ui, state: &AppState) {
    let Some(report) = &state.report else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Select samples to see their statistics.");
        });
        return;
    };

    let window = state.cache.config().regression;
    ui.label(format!(
        "{} sample(s), modulus fitted over strain {}–{}",
        report.samples.len(),
        window.start,
        window.end
    ));

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(140.0))
        .columns(Column::auto().at_least(100.0), 4)
        .header(20.0, |mut header| {
            for title in ["Metric", "Mean", "Std dev", "Unit", "n"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (metric, stat) in &report.statistics {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(metric.label());
                    });
                    row.col(|ui| {
                        ui.monospace(format!("{:.6}", stat.mean));
                    });
                    row.col(|ui| {
                        ui.monospace(format!("{:.6}", stat.std_dev));
                    });
                    row.col(|ui| {
                        ui.label(stat.unit.as_str());
                    });
                    row.col(|ui| {
                        ui.label(stat.count.to_string());
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn import_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Import tensile test export")
        .add_filter("Shimadzu raw data file", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.import(&path);
    }
}

fn project_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new().add_filter("TenTackle project", &["json"])
}

pub fn open_project_dialog(state: &mut AppState) {
    if !confirm_discard(state) {
        return;
    }
    if let Some(path) = project_dialog().set_title("Open project").pick_file() {
        state.open_project(&path, true);
    }
}

fn save_project(state: &mut AppState) {
    if state.cache.snapshot_path().is_some() {
        state.save_project(None);
    } else {
        save_project_as_dialog(state);
    }
}

pub fn save_project_as_dialog(state: &mut AppState) {
    if let Some(path) = project_dialog()
        .set_title("Save project as")
        .set_file_name("project.json")
        .save_file()
    {
        state.save_project(Some(&path));
    }
}

/// Ask before throwing away unsaved changes.
fn confirm_discard(state: &AppState) -> bool {
    if state.cache.is_empty() || !state.cache.modified() {
        return true;
    }
    let answer = rfd::MessageDialog::new()
        .set_title("Unsaved changes")
        .set_description("The current selection has unsaved changes. Discard them?")
        .set_buttons(rfd::MessageButtons::YesNo)
        .show();
    answer == rfd::MessageDialogResult::Yes
}
