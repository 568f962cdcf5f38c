use std::collections::BTreeMap;
use std::path::Path;

use tentackle::analysis::AnalysisReport;
use tentackle::cache::{parse_selection, RemovalScope, SelectionCache};
use tentackle::config::Config;
use tentackle::data::{Curve, SampleRef, Table, TableId};
use tentackle::error::ComputationError;

use crate::color::ColorMap;

/// A curve ready for plotting.
pub struct PlotCurve {
    pub sample: SampleRef,
    pub label: String,
    pub curve: Curve,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// The working session.
    pub cache: SelectionCache,

    /// Selection typed by the user for the next import (empty = all).
    pub selection_input: String,

    /// Edit buffer for the session notes.
    pub notes: String,

    /// Statistics over the current selection (recomputed on change).
    pub report: Option<AnalysisReport>,

    /// Curves of the active samples (rebuilt on change).
    pub curves: Vec<PlotCurve>,

    /// Colour per active sample.
    pub colors: ColorMap,

    /// Truncation slider values not yet committed to the cache.
    pub truncation_drafts: BTreeMap<SampleRef, u8>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            cache: SelectionCache::new(config),
            selection_input: String::new(),
            notes: String::new(),
            report: None,
            curves: Vec::new(),
            colors: ColorMap::default(),
            truncation_drafts: BTreeMap::new(),
            status_message: None,
        }
    }

    /// Parse an export and select from it.
    pub fn import(&mut self, path: &Path) {
        let selection = match parse_selection(&self.selection_input) {
            Ok(list) if list.is_empty() => None,
            Ok(list) => Some(list),
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };

        match Table::open(path) {
            Ok(table) => {
                let name = table.name().to_string();
                let kept = self.cache.cache(table, selection.as_deref());
                log::info!("Imported {name}: {kept} sample(s) selected");
                self.status_message =
                    (kept == 0).then(|| format!("{name}: none of the selected samples exist"));
                self.refresh();
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Restore a saved session. `force` discards the current selection.
    pub fn open_project(&mut self, path: &Path, force: bool) {
        match self.cache.restore_snapshot(path, force) {
            Ok(report) => {
                self.status_message = (!report.failed.is_empty()).then(|| {
                    let names: Vec<String> = report
                        .failed
                        .iter()
                        .map(|(p, _)| p.display().to_string())
                        .collect();
                    format!("Could not re-open: {}", names.join(", "))
                });
                self.notes = self.cache.notes().to_string();
                self.refresh();
            }
            Err(e) => {
                log::error!("Failed to open project: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Save to `path`, or to the current project file when `None`.
    pub fn save_project(&mut self, path: Option<&Path>) {
        self.cache.set_notes(self.notes.clone());
        match self.cache.take_snapshot(path) {
            Ok(written) => {
                log::info!("Project saved to {}", written.display());
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to save project: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn new_project(&mut self) {
        self.cache.reset();
        self.notes.clear();
        self.status_message = None;
        self.refresh();
    }

    pub fn undo(&mut self) {
        if self.cache.undo().0 {
            self.refresh();
        }
    }

    pub fn redo(&mut self) {
        if self.cache.redo().0 {
            self.refresh();
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.refresh();
    }

    pub fn remove(&mut self, table: TableId, scope: RemovalScope) {
        if self.cache.remove(table, scope) {
            self.refresh();
        }
    }

    /// Commit a slider value; 100 % means no truncation.
    pub fn commit_truncation(&mut self, sample: SampleRef, pct: u8) {
        let truncation = (pct < 100).then_some(pct);
        let current = self
            .cache
            .truncation(sample.table, sample.key.batch, sample.key.subbatch);
        if current == Some(truncation) {
            return;
        }
        match self.cache.set_truncation(
            sample.table,
            sample.key.batch,
            sample.key.subbatch,
            truncation,
        ) {
            Ok(()) => self.refresh(),
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    /// Rebuild everything derived from the selection.
    pub fn refresh(&mut self) {
        let samples: Vec<SampleRef> = self
            .cache
            .active_samples()
            .iter()
            .map(|s| s.sample_ref())
            .collect();
        self.colors = ColorMap::new(&samples);

        self.curves = self
            .cache
            .active_samples()
            .iter()
            .filter_map(|s| match s.curve() {
                Ok(curve) => Some(PlotCurve {
                    sample: s.sample_ref(),
                    label: s.label(),
                    curve,
                }),
                Err(e) => {
                    log::warn!("Cannot plot {}: {e}", s.label());
                    None
                }
            })
            .collect();

        self.truncation_drafts = self
            .cache
            .active_samples()
            .iter()
            .map(|s| (s.sample_ref(), s.truncation.unwrap_or(100)))
            .collect();

        self.report = match self.cache.analyze(None) {
            Ok(report) => Some(report),
            Err(ComputationError::EmptySelection) => None,
            Err(e) => {
                log::warn!("Analysis failed: {e}");
                None
            }
        };
    }
}
