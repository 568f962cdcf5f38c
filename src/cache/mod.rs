//! Selection cache: which samples of which imported tables are active.
//!
//! Every mutation stores a full copy of the selection in [`History`], so
//! undo/redo is a pointer move. Snapshots on disk record table *paths*; the
//! tables themselves are re-parsed on restore.
pub mod history;
pub mod selection;
pub mod snapshot;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{self, AnalysisReport};
use crate::config::Config;
use crate::data::model::{Curve, SampleKey, SampleRef, TableId, Truncation};
use crate::data::table::Table;
use crate::error::{CacheError, ComputationError, FormatError, PersistenceError};

pub use history::{History, Selection, SelectionEntry};
pub use selection::{parse_selection, SampleSelection};
pub use snapshot::{SnapshotDocument, SCHEMA_VERSION};

use snapshot::{decode_truncation, encode_truncation};

/// What [`SelectionCache::remove`] drops from a table's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalScope {
    Table,
    Batch(u32),
    Sample(u32, u32),
}

/// One active sample, borrowed from the cache.
#[derive(Debug, Clone, Copy)]
pub struct ActiveSample<'a> {
    pub table: &'a Arc<Table>,
    pub key: SampleKey,
    pub truncation: Truncation,
}

impl ActiveSample<'_> {
    pub fn sample_ref(&self) -> SampleRef {
        SampleRef {
            table: self.table.id(),
            key: self.key,
        }
    }

    /// `name-batch-subbatch`, as used for legends.
    pub fn label(&self) -> String {
        format!("{}-{}", self.table.name(), self.key)
    }

    pub fn curve(&self) -> Result<Curve, crate::error::SampleError> {
        self.table
            .curve(self.key.batch, self.key.subbatch, self.truncation)
    }
}

/// Outcome of a successful [`SelectionCache::restore_snapshot`].
#[derive(Debug)]
pub struct RestoreReport {
    /// Schema version of the document that was read.
    pub version: u64,
    /// Tables that were re-parsed and selected.
    pub restored: Vec<TableId>,
    /// Source files that could not be re-parsed.
    pub failed: Vec<(PathBuf, FormatError)>,
    /// Stored samples that no longer exist or had an invalid truncation.
    pub skipped_samples: usize,
    /// Config recorded in the document. Informational only.
    pub config: Option<Config>,
}

impl RestoreReport {
    /// Status code of the snapshot interface for a successful restore.
    pub fn status_code(&self) -> i32 {
        0
    }
}

// ---------------------------------------------------------------------------
// SelectionCache
// ---------------------------------------------------------------------------

/// The working session: imported tables, active selection and its history.
#[derive(Debug)]
pub struct SelectionCache {
    config: Config,
    tables: BTreeMap<TableId, Arc<Table>>,
    history: History,
    /// Revision that matches the file at `snapshot_path`.
    saved_revision: u64,
    snapshot_path: Option<PathBuf>,
    notes: String,
    /// Notes as of the last save or restore.
    saved_notes: String,
}

impl SelectionCache {
    pub fn new(config: Config) -> Self {
        let history = History::default();
        Self {
            config,
            tables: BTreeMap::new(),
            saved_revision: history.revision(),
            history,
            snapshot_path: None,
            notes: String::new(),
            saved_notes: String::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current selection.
    pub fn selection(&self) -> &Selection {
        self.history.current()
    }

    pub fn is_empty(&self) -> bool {
        self.selection().is_empty()
    }

    /// Number of active samples across all tables.
    pub fn len(&self) -> usize {
        self.selection().values().map(|e| e.len()).sum()
    }

    /// A table referenced by the current selection or by its history.
    pub fn table(&self, id: TableId) -> Option<&Arc<Table>> {
        self.tables.get(&id)
    }

    /// Tables with at least one active sample.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> + '_ {
        self.selection()
            .keys()
            .filter_map(|id| self.tables.get(id))
    }

    pub fn active_samples(&self) -> Vec<ActiveSample<'_>> {
        self.selection()
            .iter()
            .filter_map(|(id, entry)| self.tables.get(id).map(|t| (t, entry)))
            .flat_map(|(table, entry)| {
                entry.iter().map(move |(key, truncation)| ActiveSample {
                    table,
                    key: *key,
                    truncation: *truncation,
                })
            })
            .collect()
    }

    pub fn truncation(&self, table: TableId, batch: u32, subbatch: u32) -> Option<Truncation> {
        self.selection()
            .get(&table)?
            .get(&SampleKey::new(batch, subbatch))
            .copied()
    }

    // -- mutations --

    /// Register a table with the given samples, or every available sample
    /// when `selections` is `None`. Samples without data are dropped
    /// silently. Replaces an earlier selection of the same table or of the
    /// same source file. Returns the number of samples kept.
    pub fn cache(
        &mut self,
        table: impl Into<Arc<Table>>,
        selections: Option<&[SampleSelection]>,
    ) -> usize {
        let table: Arc<Table> = table.into();

        let mut entry = SelectionEntry::new();
        match selections {
            Some(items) => {
                for item in items {
                    let SampleKey { batch, subbatch } = item.key;
                    if item.truncation.is_some_and(|p| p > 100) {
                        log::debug!(
                            "{}: dropping {item}, truncation above 100",
                            table.name()
                        );
                    } else if table.has_sample(batch, subbatch) {
                        entry.insert(item.key, item.truncation);
                    } else {
                        log::debug!(
                            "{}: dropping {item}, no data for that sample",
                            table.name()
                        );
                    }
                }
            }
            None => {
                for key in table.samples() {
                    entry.insert(key, None);
                }
            }
        }

        let mut next = self.selection().clone();
        next.retain(|id, _| {
            *id != table.id()
                && self
                    .tables
                    .get(id)
                    .map_or(true, |t| t.path() != table.path())
        });

        let accepted = entry.len();
        if entry.is_empty() {
            log::warn!("{}: no valid samples selected", table.name());
        } else {
            log::info!("{}: cached {accepted} sample(s)", table.name());
            self.tables.insert(table.id(), Arc::clone(&table));
            next.insert(table.id(), entry);
        }
        self.commit(next);
        accepted
    }

    /// Change the truncation point of one active sample.
    pub fn set_truncation(
        &mut self,
        table: TableId,
        batch: u32,
        subbatch: u32,
        pct: Truncation,
    ) -> Result<(), CacheError> {
        if let Some(p) = pct.filter(|p| *p > 100) {
            return Err(CacheError::InvalidTruncation(p));
        }
        let mut next = self.selection().clone();
        let slot = next
            .get_mut(&table)
            .ok_or(CacheError::UnknownTable(table))?
            .get_mut(&SampleKey::new(batch, subbatch))
            .ok_or(CacheError::NotSelected {
                table,
                batch,
                subbatch,
            })?;
        *slot = pct;
        self.commit(next);
        Ok(())
    }

    /// Drop a sample, a batch or a whole table. Returns whether anything
    /// was selected in that scope; nothing is recorded otherwise.
    pub fn remove(&mut self, table: TableId, scope: RemovalScope) -> bool {
        let mut next = self.selection().clone();
        let Some(entry) = next.get_mut(&table) else {
            return false;
        };

        let before = entry.len();
        match scope {
            RemovalScope::Table => entry.clear(),
            RemovalScope::Batch(batch) => entry.retain(|k, _| k.batch != batch),
            RemovalScope::Sample(batch, subbatch) => {
                entry.remove(&SampleKey::new(batch, subbatch));
            }
        }
        if entry.len() == before {
            return false;
        }
        if entry.is_empty() {
            next.remove(&table);
        }
        self.commit(next);
        true
    }

    /// Empty the selection. Undoable.
    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.commit(Selection::new());
        }
    }

    /// Forget everything: selection, history, tables, snapshot path and
    /// notes. Not undoable.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Returns `(undone, can_undo_again)`.
    pub fn undo(&mut self) -> (bool, bool) {
        self.history.undo()
    }

    /// Returns `(redone, can_redo_again)`.
    pub fn redo(&mut self) -> (bool, bool) {
        self.history.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Whether the selection or the notes differ from the last save or
    /// restore.
    pub fn modified(&self) -> bool {
        self.history.revision() != self.saved_revision || self.notes != self.saved_notes
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// File the session was last saved to or restored from.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    // -- reading curves and statistics --

    /// Curve of an active sample with its truncation applied.
    pub fn get_curve(&self, table: TableId, batch: u32, subbatch: u32) -> Result<Curve, CacheError> {
        let truncation = self
            .truncation(table, batch, subbatch)
            .ok_or(CacheError::NotSelected {
                table,
                batch,
                subbatch,
            })?;
        let source = self.tables.get(&table).ok_or(CacheError::UnknownTable(table))?;
        Ok(source.curve(batch, subbatch, truncation)?)
    }

    /// Statistics over the active selection, or over the active samples
    /// listed in `subset`.
    pub fn analyze(&self, subset: Option<&[SampleRef]>) -> Result<AnalysisReport, ComputationError> {
        let mut samples = self.active_samples();
        if let Some(subset) = subset {
            samples.retain(|s| subset.contains(&s.sample_ref()));
        }
        analysis::analyze(&samples, &self.config)
    }

    // -- persistence --

    /// Write the selection to `path`, or to the associated snapshot file
    /// when `path` is `None`. Returns the path written.
    pub fn take_snapshot(&mut self, path: Option<&Path>) -> Result<PathBuf, PersistenceError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| self.snapshot_path.clone())
            .ok_or(PersistenceError::NoPath)?;

        let mut assets = BTreeMap::new();
        for sample in self.active_samples() {
            let file = sample.table.path().to_string_lossy().into_owned();
            assets.entry(file).or_insert_with(Vec::new).push((
                sample.key.batch,
                sample.key.subbatch,
                encode_truncation(sample.truncation),
            ));
        }

        SnapshotDocument::new(assets, self.config.clone(), &self.notes).write(&path)?;
        log::info!("Saved {} sample(s) to {}", self.len(), path.display());

        self.saved_revision = self.history.revision();
        self.saved_notes = self.notes.clone();
        self.snapshot_path = Some(path.clone());
        Ok(path)
    }

    /// Replace the selection with the one stored at `path`. The replacement
    /// is recorded like any other mutation, so it can be undone.
    ///
    /// Refuses when the selection is not empty unless `force` is set. Files
    /// that fail to re-parse are reported and skipped. On error the cache
    /// is left untouched.
    pub fn restore_snapshot(
        &mut self,
        path: &Path,
        force: bool,
    ) -> Result<RestoreReport, PersistenceError> {
        if !force && !self.is_empty() {
            return Err(PersistenceError::CacheNotEmpty);
        }
        let doc = SnapshotDocument::read(path)?;

        let mut tables = BTreeMap::new();
        let mut selection = Selection::new();
        let mut report = RestoreReport {
            version: doc.version,
            restored: Vec::new(),
            failed: Vec::new(),
            skipped_samples: 0,
            config: doc.config.clone(),
        };

        for (file, samples) in &doc.assets {
            let source = resolve_asset(file, path);
            let table = match Table::open(&source) {
                Ok(table) => Arc::new(table),
                Err(e) => {
                    log::warn!("Skipping {file} while restoring {}: {e}", path.display());
                    report.failed.push((source, e));
                    continue;
                }
            };

            let mut entry = SelectionEntry::new();
            for &(batch, subbatch, stored) in samples {
                match decode_truncation(stored) {
                    Some(truncation) if table.has_sample(batch, subbatch) => {
                        entry.insert(SampleKey::new(batch, subbatch), truncation);
                    }
                    _ => {
                        log::warn!("{file}: skipping stored sample {batch}-{subbatch} ({stored})");
                        report.skipped_samples += 1;
                    }
                }
            }
            if entry.is_empty() {
                continue;
            }
            report.restored.push(table.id());
            selection.insert(table.id(), entry);
            tables.insert(table.id(), table);
        }

        self.tables.extend(tables);
        self.commit(selection);
        self.saved_revision = self.history.revision();
        self.snapshot_path = Some(path.to_path_buf());
        self.notes = doc.metadata.notes;
        self.saved_notes = self.notes.clone();

        log::info!(
            "Restored {} table(s), {} sample(s) from {}",
            report.restored.len(),
            self.len(),
            path.display()
        );
        Ok(report)
    }

    // -- internals --

    fn commit(&mut self, next: Selection) {
        self.history.push(next);
        let history = &self.history;
        self.tables.retain(|id, _| history.references(*id));
    }
}

/// Relative asset paths are tried against the snapshot's directory when
/// they do not exist relative to the working directory.
fn resolve_asset(file: &str, snapshot: &Path) -> PathBuf {
    let path = PathBuf::from(file);
    if path.is_relative() && !path.exists() {
        if let Some(dir) = snapshot.parent() {
            let candidate = dir.join(&path);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Dimensions;
    use crate::data::synthetic::{ramp, ExportBuilder};
    use crate::data::table::Variant;
    use tempfile::TempDir;

    fn dims() -> Dimensions {
        Dimensions {
            thickness: 1.0,
            width: 4.0,
            length: 20.0,
        }
    }

    /// Two samples, batch count 2, subbatch count 1.
    fn write_pair(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        ExportBuilder::new(Variant::Legacy, 2, 1)
            .sample(1, 1, dims(), ramp(20, 100.0, 4.0))
            .sample(2, 1, dims(), ramp(20, 110.0, 4.4))
            .write(&path)
            .unwrap();
        path
    }

    fn open(path: &Path) -> Arc<Table> {
        Arc::new(Table::open(path).unwrap())
    }

    fn triples(cache: &SelectionCache) -> Vec<(PathBuf, u32, u32, Truncation)> {
        cache
            .active_samples()
            .iter()
            .map(|s| {
                (
                    s.table.path().to_path_buf(),
                    s.key.batch,
                    s.key.subbatch,
                    s.truncation,
                )
            })
            .collect()
    }

    #[test]
    fn cache_all_then_remove_batch_then_undo() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());

        assert_eq!(cache.cache(table, None), 2);
        assert_eq!(cache.len(), 2);

        assert!(cache.remove(id, RemovalScope::Batch(1)));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.undo(), (true, true));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn undo_redo_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let mut cache = SelectionCache::new(Config::default());

        cache.cache(table, Some(&[SampleSelection::truncated(2, 1, 60)]));
        let after_cache = cache.selection().clone();

        assert_eq!(cache.undo(), (true, false));
        assert!(cache.is_empty());
        assert_eq!(cache.redo(), (true, false));
        assert_eq!(cache.selection(), &after_cache);
        assert_eq!(cache.redo(), (false, false));
    }

    #[test]
    fn invalid_selections_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());

        let picked = [
            SampleSelection::new(1, 1),
            SampleSelection::new(2, 2),
            SampleSelection::new(7, 1),
        ];
        assert_eq!(cache.cache(table, Some(&picked)), 1);
        assert_eq!(cache.truncation(id, 1, 1), Some(None));
        assert_eq!(cache.truncation(id, 2, 2), None);
    }

    #[test]
    fn out_of_range_truncation_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());

        let picked = [
            SampleSelection::truncated(1, 1, 150),
            SampleSelection::truncated(2, 1, 100),
        ];
        assert_eq!(cache.cache(table, Some(&picked)), 1);
        assert_eq!(cache.truncation(id, 1, 1), None);
        assert!(matches!(
            cache.get_curve(id, 1, 1),
            Err(CacheError::NotSelected { .. })
        ));
        assert_eq!(cache.get_curve(id, 2, 1).unwrap().len(), 20);
    }

    #[test]
    fn reimport_replaces_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pair(&dir, "a.csv");
        let mut cache = SelectionCache::new(Config::default());

        let first = open(&path);
        let first_id = first.id();
        cache.cache(first, None);

        let second = open(&path);
        let second_id = second.id();
        cache.cache(second, Some(&[SampleSelection::new(2, 1)]));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.tables().count(), 1);
        assert!(cache.truncation(first_id, 1, 1).is_none());
        assert_eq!(cache.truncation(second_id, 2, 1), Some(None));
    }

    #[test]
    fn set_truncation_is_recorded_and_checked() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);

        cache.set_truncation(id, 1, 1, Some(50)).unwrap();
        assert_eq!(cache.get_curve(id, 1, 1).unwrap().len(), 10);
        assert_eq!(cache.get_curve(id, 2, 1).unwrap().len(), 20);

        assert!(matches!(
            cache.set_truncation(id, 1, 1, Some(101)),
            Err(CacheError::InvalidTruncation(101))
        ));
        assert!(matches!(
            cache.set_truncation(id, 2, 2, Some(10)),
            Err(CacheError::NotSelected { .. })
        ));

        cache.undo();
        assert_eq!(cache.get_curve(id, 1, 1).unwrap().len(), 20);
    }

    #[test]
    fn removing_last_sample_drops_table_entry() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);

        assert!(cache.remove(id, RemovalScope::Sample(1, 1)));
        assert!(cache.remove(id, RemovalScope::Sample(2, 1)));
        assert!(cache.is_empty());
        assert!(!cache.remove(id, RemovalScope::Table));
        // still reachable through history
        assert!(cache.table(id).is_some());

        cache.undo();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn discarded_branches_release_tables() {
        let dir = tempfile::tempdir().unwrap();
        let a = open(&write_pair(&dir, "a.csv"));
        let b = open(&write_pair(&dir, "b.csv"));
        let a_id = a.id();
        let mut cache = SelectionCache::new(Config::default());

        cache.cache(a, None);
        cache.undo();
        cache.cache(b, None);

        assert!(cache.table(a_id).is_none());
        assert!(!cache.can_redo());
    }

    #[test]
    fn clear_is_undoable_and_reset_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);

        cache.clear();
        assert!(cache.is_empty());
        cache.undo();
        assert_eq!(cache.len(), 2);

        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.undo(), (false, false));
        assert!(!cache.modified());
        assert!(cache.snapshot_path().is_none());
    }

    #[test]
    fn snapshot_round_trip_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let snap = dir.path().join("session.json");

        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);
        cache.set_truncation(id, 2, 1, Some(75)).unwrap();
        cache.set_notes("batch A, room temperature");
        assert!(cache.modified());

        assert_eq!(cache.take_snapshot(Some(&snap)).unwrap(), snap);
        assert!(!cache.modified());

        let mut restored = SelectionCache::new(Config::default());
        let report = restored.restore_snapshot(&snap, false).unwrap();
        assert_eq!(report.status_code(), 0);
        assert_eq!(report.version, SCHEMA_VERSION);
        assert!(report.failed.is_empty());
        assert_eq!(triples(&restored), triples(&cache));
        assert!(!restored.modified());
        assert_eq!(restored.notes(), "batch A, room temperature");
        assert_eq!(restored.snapshot_path(), Some(snap.as_path()));
    }

    #[test]
    fn save_without_path_uses_associated_file() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);

        assert!(matches!(
            cache.take_snapshot(None),
            Err(PersistenceError::NoPath)
        ));
        let snap = dir.path().join("s.json");
        cache.take_snapshot(Some(&snap)).unwrap();
        cache.clear();
        assert!(cache.modified());
        assert_eq!(cache.take_snapshot(None).unwrap(), snap);
        assert!(!cache.modified());
    }

    #[test]
    fn modified_tracks_undo_then_edit() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let snap = dir.path().join("s.json");
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, None);
        cache.take_snapshot(Some(&snap)).unwrap();

        cache.remove(id, RemovalScope::Sample(1, 1));
        assert!(cache.modified());
        cache.undo();
        assert!(!cache.modified());

        // same pointer position as the save, different content
        cache.undo();
        cache.cache(open(&write_pair(&dir, "b.csv")), None);
        assert!(cache.modified());
    }

    #[test]
    fn restore_refuses_non_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let snap = dir.path().join("s.json");
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(table, Some(&[SampleSelection::new(1, 1)]));
        cache.take_snapshot(Some(&snap)).unwrap();

        cache.cache(open(&write_pair(&dir, "b.csv")), None);
        let before = triples(&cache);

        let err = cache.restore_snapshot(&snap, false).unwrap_err();
        assert_eq!(err.status_code(), -2);
        assert_eq!(triples(&cache), before);

        cache.restore_snapshot(&snap, true).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.modified());

        // the forced restore is undoable like any other change
        assert!(cache.undo().0);
        assert_eq!(triples(&cache), before);
        assert!(cache.modified());
    }

    #[test]
    fn restore_after_clear_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let snap = dir.path().join("s.json");
        let mut cache = SelectionCache::new(Config::default());
        cache.cache(open(&write_pair(&dir, "a.csv")), None);
        cache.take_snapshot(Some(&snap)).unwrap();

        cache.cache(open(&write_pair(&dir, "b.csv")), None);
        let before_clear = triples(&cache);
        cache.clear();

        cache.restore_snapshot(&snap, false).unwrap();
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.undo(), (true, true));
        assert!(cache.is_empty());
        assert_eq!(cache.undo(), (true, true));
        assert_eq!(triples(&cache), before_clear);

        cache.redo();
        cache.redo();
        assert_eq!(cache.len(), 2);
        assert!(!cache.modified());
    }

    #[test]
    fn unsaved_notes_count_as_modified() {
        let dir = tempfile::tempdir().unwrap();
        let snap = dir.path().join("s.json");
        let mut cache = SelectionCache::new(Config::default());
        assert!(!cache.modified());

        cache.set_notes("specimens conditioned 48 h");
        assert!(cache.modified());

        cache.cache(open(&write_pair(&dir, "a.csv")), None);
        cache.take_snapshot(Some(&snap)).unwrap();
        assert!(!cache.modified());

        cache.set_notes("specimens conditioned 72 h");
        assert!(cache.modified());
        cache.set_notes("specimens conditioned 48 h");
        assert!(!cache.modified());
    }

    #[test]
    fn restore_reports_missing_and_broken_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SelectionCache::new(Config::default());

        let err = cache
            .restore_snapshot(&dir.path().join("none.json"), false)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
        assert_eq!(err.status_code(), -1);

        let junk = dir.path().join("junk.json");
        std::fs::write(&junk, "this is not json").unwrap();
        let err = cache.restore_snapshot(&junk, false).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { .. }));
        assert_eq!(err.status_code(), -1);
    }

    #[test]
    fn restore_continues_past_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pair(&dir, "a.csv");
        let b = write_pair(&dir, "b.csv");
        let snap = dir.path().join("s.json");

        let mut cache = SelectionCache::new(Config::default());
        cache.cache(open(&a), None);
        cache.cache(open(&b), None);
        cache.take_snapshot(Some(&snap)).unwrap();
        std::fs::remove_file(&b).unwrap();

        let mut restored = SelectionCache::new(Config::default());
        let report = restored.restore_snapshot(&snap, false).unwrap();
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, b);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn restores_legacy_documents() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(&dir, "a.csv");
        let snap = dir.path().join("old.json");
        // relative path, resolved against the snapshot directory
        std::fs::write(&snap, r#"{ "a.csv": [[1, 1, -1], [2, 1, 30], [5, 5, -1]] }"#).unwrap();

        let mut cache = SelectionCache::new(Config::default());
        let report = cache.restore_snapshot(&snap, false).unwrap();
        assert_eq!(report.version, 1);
        assert_eq!(report.skipped_samples, 1);
        assert_eq!(cache.len(), 2);

        let id = report.restored[0];
        assert_eq!(cache.truncation(id, 2, 1), Some(Some(30)));
    }

    #[test]
    fn analyze_subset_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = open(&write_pair(&dir, "a.csv"));
        let id = table.id();
        let mut cache = SelectionCache::new(Config::default());
        assert_eq!(
            cache.analyze(None).unwrap_err(),
            ComputationError::EmptySelection
        );

        cache.cache(table, None);
        assert_eq!(cache.analyze(None).unwrap().samples.len(), 2);

        let only = [SampleRef::new(id, 2, 1)];
        let report = cache.analyze(Some(&only)).unwrap();
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].sample, only[0]);
    }
}
