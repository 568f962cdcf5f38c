use std::fmt;
use std::path::{Path, PathBuf};

use encoding_rs::SHIFT_JIS;

use crate::error::{FormatError, SampleError};

use super::curve;
use super::model::{Curve, Dimensions, RawCurve, SampleKey, TableId, Truncation};

/// Rows preceding the first per-sample row of the metadata sub-table.
pub const DIMENSION_ROW_BASE: usize = 3;
/// Header rows at the top of every raw data sub-table.
pub const DATA_HEADER_ROWS: usize = 3;

const LEGACY_HINT: &str = ".xtak";
const VARIANT_B_HINT: &str = ".xtdx";

// ---------------------------------------------------------------------------
// Instrument variants
// ---------------------------------------------------------------------------

/// Generation of the testing software that wrote the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Legacy,
    VariantB,
}

/// Positions of the sub-tables the parser reads, per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    pub meta_table: usize,
    pub data_table_base: usize,
}

impl Variant {
    /// File-extension hint recorded in sub-table 0.
    pub fn hint(self) -> &'static str {
        match self {
            Variant::Legacy => LEGACY_HINT,
            Variant::VariantB => VARIANT_B_HINT,
        }
    }

    pub(crate) fn layout(self) -> Layout {
        match self {
            Variant::Legacy => Layout {
                meta_table: 2,
                data_table_base: 3,
            },
            Variant::VariantB => Layout {
                meta_table: 3,
                data_table_base: 4,
            },
        }
    }

    /// Inspect sub-table 0 for the extension hint. Unknown files are read
    /// with the legacy layout.
    fn detect(first: &[Vec<String>], path: &Path) -> Self {
        let ends_with = |cell: &str, hint: &str| cell.trim().to_ascii_lowercase().ends_with(hint);
        let cells = || first.iter().flatten();

        if cells().any(|c| ends_with(c.as_str(), VARIANT_B_HINT)) {
            Variant::VariantB
        } else if cells().any(|c| ends_with(c.as_str(), LEGACY_HINT)) {
            Variant::Legacy
        } else {
            log::warn!(
                "{}: no {LEGACY_HINT} or {VARIANT_B_HINT} hint found, assuming legacy layout",
                path.display()
            );
            Variant::Legacy
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Legacy => write!(f, "legacy"),
            Variant::VariantB => write!(f, "variant B"),
        }
    }
}

type SubTable = Vec<Vec<String>>;

// ---------------------------------------------------------------------------
// Table – one parsed export
// ---------------------------------------------------------------------------

/// Raw contents of one instrument export, addressed positionally.
///
/// Immutable once parsed; curves are derived on request.
#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    name: String,
    path: PathBuf,
    variant: Variant,
    batch_count: u32,
    subbatch_count: u32,
    sub_tables: Vec<SubTable>,
}

impl Table {
    /// Parse an export; the display name is the file stem.
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let name = default_name(path);
        Self::open_named(path, &name)
    }

    pub fn open_named(path: &Path, name: &str) -> Result<Self, FormatError> {
        let bytes = std::fs::read(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, path, name)
    }

    /// Parse already loaded file contents. `path` is recorded as the origin.
    pub fn from_bytes(bytes: &[u8], path: &Path, name: &str) -> Result<Self, FormatError> {
        let (text, _, had_errors) = SHIFT_JIS.decode(bytes);
        if had_errors {
            log::warn!(
                "{}: contains bytes that are not valid Shift-JIS",
                path.display()
            );
        }

        let sub_tables = split_sub_tables(&text, path)?;
        let first = sub_tables.first().ok_or(FormatError::MissingSubTable {
            path: path.to_path_buf(),
            index: 0,
            found: 0,
        })?;
        let variant = Variant::detect(first, path);

        let mut table = Table {
            id: TableId::next(),
            name: name.to_string(),
            path: path.to_path_buf(),
            variant,
            batch_count: 0,
            subbatch_count: 0,
            sub_tables,
        };
        let (batch_count, subbatch_count) = table.read_counts()?;
        table.batch_count = batch_count;
        table.subbatch_count = subbatch_count;

        log::info!(
            "{}: {variant} export, batch count: {batch_count}, subbatch count: {subbatch_count}",
            path.display()
        );
        Ok(table)
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Batch count declared in the header. May overstate what the file holds.
    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }

    pub fn subbatch_count(&self) -> u32 {
        self.subbatch_count
    }

    /// Number of blank-row separated sub-tables in the file.
    pub fn sub_table_count(&self) -> usize {
        self.sub_tables.len()
    }

    /// Geometry of one sample, read from the metadata sub-table.
    pub fn dimensions(&self, batch: u32, subbatch: u32) -> Result<Dimensions, SampleError> {
        let layout = self.variant.layout();
        let row = DIMENSION_ROW_BASE + sample_offset(batch, subbatch);
        let meta = self
            .sub_tables
            .get(layout.meta_table)
            .ok_or_else(|| self.missing_table(layout.meta_table))?;
        let cells = meta
            .get(row)
            .ok_or(SampleError::OutOfRange { batch, subbatch })?;

        let number = |column: usize, what: &'static str| -> Result<f64, FormatError> {
            let cell = cells.get(column).ok_or_else(|| FormatError::MissingCell {
                path: self.path.clone(),
                table: layout.meta_table,
                row,
                column,
            })?;
            self.parse_number(cell, what)
        };
        let dims = Dimensions {
            thickness: number(1, "thickness")?,
            width: number(2, "width")?,
            length: number(3, "length")?,
        };
        if !(dims.thickness > 0.0 && dims.width > 0.0 && dims.length > 0.0) {
            return Err(FormatError::InvalidDimensions {
                path: self.path.clone(),
                batch,
                subbatch,
            }
            .into());
        }

        log::debug!("Dimensions for batch {batch}, subbatch {subbatch}: {dims:?}");
        Ok(dims)
    }

    /// Force and elongation columns of one sample.
    pub fn raw(&self, batch: u32, subbatch: u32) -> Result<RawCurve, SampleError> {
        let block = self
            .data_block(batch, subbatch)
            .ok_or(SampleError::OutOfRange { batch, subbatch })?;

        let mut raw = RawCurve {
            force: Vec::new(),
            elongation: Vec::new(),
        };
        for row in block.iter().skip(DATA_HEADER_ROWS) {
            let force = row.get(1).map(|c| c.trim()).unwrap_or("");
            let elongation = row.get(2).map(|c| c.trim()).unwrap_or("");
            if force.is_empty() && elongation.is_empty() {
                continue;
            }
            raw.force.push(self.parse_number(force, "force")?);
            raw.elongation.push(self.parse_number(elongation, "elongation")?);
        }
        Ok(raw)
    }

    /// Dry run of [`Table::curve`]: whether the coordinate is declared and
    /// its raw data block is present. Nothing is parsed.
    pub fn has_sample(&self, batch: u32, subbatch: u32) -> bool {
        batch >= 1
            && subbatch >= 1
            && batch <= self.batch_count
            && subbatch <= self.subbatch_count
            && self.data_block(batch, subbatch).is_some()
    }

    /// Stress/strain curve of one sample, optionally truncated.
    pub fn curve(
        &self,
        batch: u32,
        subbatch: u32,
        truncation: Truncation,
    ) -> Result<Curve, SampleError> {
        if !self.has_sample(batch, subbatch) {
            return Err(SampleError::OutOfRange { batch, subbatch });
        }
        let raw = self.raw(batch, subbatch)?;
        let dims = self.dimensions(batch, subbatch)?;
        let curve = Curve::from_raw(&raw, &dims);
        Ok(match truncation {
            Some(pct) => curve::truncate(&curve, pct),
            None => curve,
        })
    }

    /// Every declared coordinate whose data block exists.
    ///
    /// Only offsets up to the last sub-table are visited, so the cost is
    /// bounded by the file size rather than by the declared counts.
    pub fn samples(&self) -> Vec<SampleKey> {
        let base = self.variant.layout().data_table_base;
        let Some(max_offset) = self.sub_tables.len().checked_sub(base + 1) else {
            return Vec::new();
        };
        let max_offset = max_offset as u64;
        let subbatch_count = u64::from(self.subbatch_count);

        let batches = u64::from(self.batch_count).min(max_offset) as u32;
        (1..=batches)
            .flat_map(|b| {
                let last = subbatch_count.min(max_offset / u64::from(b)) as u32;
                (1..=last).map(move |s| SampleKey::new(b, s))
            })
            .filter(|k| self.has_sample(k.batch, k.subbatch))
            .collect()
    }

    // -- internals --

    fn data_block(&self, batch: u32, subbatch: u32) -> Option<&SubTable> {
        let index = self.variant.layout().data_table_base + sample_offset(batch, subbatch);
        self.sub_tables.get(index)
    }

    fn read_counts(&self) -> Result<(u32, u32), FormatError> {
        let (batch, subbatch) = match self.variant {
            Variant::Legacy => {
                let b = self.cell(2, 1, 1)?;
                let s = self.cell(2, 1, 2)?;
                (self.parse_count(b)?, self.parse_count(s)?)
            }
            Variant::VariantB => {
                let cell = self.cell(1, 1, 1)?;
                let (b, s) = cell.split_once('_').ok_or_else(|| FormatError::InvalidNumber {
                    path: self.path.clone(),
                    what: "batch/subbatch count",
                    value: cell.to_string(),
                })?;
                (self.parse_count(b)?, self.parse_count(s)?)
            }
        };
        if batch <= 0 || subbatch <= 0 {
            return Err(FormatError::NonPositiveCount {
                path: self.path.clone(),
                batch,
                subbatch,
            });
        }
        Ok((batch as u32, subbatch as u32))
    }

    fn cell(&self, table: usize, row: usize, column: usize) -> Result<&str, FormatError> {
        let sub = self
            .sub_tables
            .get(table)
            .ok_or_else(|| self.missing_table(table))?;
        sub.get(row)
            .and_then(|r| r.get(column))
            .map(|c| c.as_str())
            .ok_or_else(|| FormatError::MissingCell {
                path: self.path.clone(),
                table,
                row,
                column,
            })
    }

    fn missing_table(&self, index: usize) -> FormatError {
        FormatError::MissingSubTable {
            path: self.path.clone(),
            index,
            found: self.sub_tables.len(),
        }
    }

    fn parse_count(&self, value: &str) -> Result<i64, FormatError> {
        let value = value.trim();
        value
            .parse::<i64>()
            .ok()
            .filter(|v| u32::try_from(*v).is_ok() || *v <= 0)
            .ok_or_else(|| FormatError::InvalidNumber {
                path: self.path.clone(),
                what: "batch/subbatch count",
                value: value.to_string(),
            })
    }

    fn parse_number(&self, value: &str, what: &'static str) -> Result<f64, FormatError> {
        let value = value.trim();
        value.parse::<f64>().map_err(|_| FormatError::InvalidNumber {
            path: self.path.clone(),
            what,
            value: value.to_string(),
        })
    }
}

/// Position of a sample inside the metadata rows and data sub-tables.
///
/// The instrument addresses samples by `batch × subbatch`, so coordinates
/// sharing a product (2-3 and 3-2, 1-4 and 2-2) alias the same data. This is
/// how existing exports are laid out and is kept as is; it is likely an
/// indexing defect in the instrument software.
pub fn sample_offset(batch: u32, subbatch: u32) -> usize {
    batch as usize * subbatch as usize
}

fn default_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split decoded text into sub-tables. Every blank row ends the current
/// sub-table, so consecutive blank rows yield empty sub-tables.
fn split_sub_tables(text: &str, path: &Path) -> Result<Vec<SubTable>, FormatError> {
    let mut tables = Vec::new();
    let mut block = String::new();
    let mut pending = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            tables.push(parse_block(&block, tables.len(), path)?);
            block.clear();
            pending = false;
        } else {
            block.push_str(line);
            block.push('\n');
            pending = true;
        }
    }
    if pending {
        tables.push(parse_block(&block, tables.len(), path)?);
    }
    Ok(tables)
}

fn parse_block(block: &str, index: usize, path: &Path) -> Result<SubTable, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(block.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .map_err(|source| FormatError::Csv {
                    path: path.to_path_buf(),
                    table: index,
                    source,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{ramp, ExportBuilder};

    fn dims() -> Dimensions {
        Dimensions {
            thickness: 2.0,
            width: 5.0,
            length: 50.0,
        }
    }

    fn parse(builder: &ExportBuilder) -> Table {
        Table::from_bytes(&builder.to_bytes(), Path::new("test.csv"), "test").unwrap()
    }

    #[test]
    fn reads_legacy_export_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run-01.csv");
        ExportBuilder::new(Variant::Legacy, 2, 1)
            .sample(1, 1, dims(), ramp(10, 100.0, 5.0))
            .sample(2, 1, dims(), ramp(12, 120.0, 6.0))
            .write(&path)
            .unwrap();

        let table = Table::open(&path).unwrap();
        assert_eq!(table.name(), "run-01");
        assert_eq!(table.variant(), Variant::Legacy);
        assert_eq!((table.batch_count(), table.subbatch_count()), (2, 1));
        assert_eq!(table.dimensions(2, 1).unwrap(), dims());
        assert_eq!(table.raw(2, 1).unwrap().len(), 12);
        assert_eq!(
            table.samples(),
            vec![SampleKey::new(1, 1), SampleKey::new(2, 1)]
        );
    }

    #[test]
    fn reads_variant_b_counts_and_offsets() {
        let raw = RawCurve {
            force: vec![0.0, 10.0, 20.0],
            elongation: vec![0.0, 0.5, 1.0],
        };
        let table = parse(
            &ExportBuilder::new(Variant::VariantB, 1, 2)
                .sample(1, 1, dims(), raw.clone())
                .sample(1, 2, dims(), ramp(5, 50.0, 2.0)),
        );
        assert_eq!(table.variant(), Variant::VariantB);
        assert_eq!((table.batch_count(), table.subbatch_count()), (1, 2));
        assert_eq!(table.raw(1, 1).unwrap(), raw);

        let curve = table.curve(1, 1, None).unwrap();
        assert_eq!(curve.stress, vec![0.0, 1.0, 2.0]);
        assert_eq!(curve.strain, vec![0.0, 0.01, 0.02]);
    }

    #[test]
    fn unknown_hint_falls_back_to_legacy() {
        let text = "info,\r\nname,sample.dat\r\n\r\nx,\r\n\r\nmeta,,,\r\ncount,1,1\r\nhdr,,,\r\n0,1,1,1\r\n1,1,2,10\r\n\r\nblock0\r\n\r\na,\r\nb,\r\nc,\r\n0,5,1\r\n";
        let table = Table::from_bytes(text.as_bytes(), Path::new("x.csv"), "x").unwrap();
        assert_eq!(table.variant(), Variant::Legacy);
        // trailing block without a blank row is kept
        let curve = table.curve(1, 1, None).unwrap();
        assert_eq!(curve.stress, vec![2.5]);
        assert_eq!(curve.strain, vec![0.1]);
    }

    #[test]
    fn declared_counts_may_overstate_data() {
        let table = parse(
            &ExportBuilder::new(Variant::Legacy, 2, 2)
                .sample(1, 1, dims(), ramp(4, 10.0, 1.0))
                .sample(2, 1, dims(), ramp(4, 10.0, 1.0)),
        );
        // offsets 1 and 2 exist, offset 4 (2-2) does not
        assert!(table.has_sample(1, 1));
        assert!(table.has_sample(1, 2));
        assert!(!table.has_sample(2, 2));
        assert!(matches!(
            table.raw(2, 2),
            Err(SampleError::OutOfRange {
                batch: 2,
                subbatch: 2
            })
        ));
        assert!(!table.has_sample(0, 1));
        assert!(!table.has_sample(3, 1));
    }

    #[test]
    fn huge_declared_counts_only_visit_present_blocks() {
        let table = parse(
            &ExportBuilder::new(Variant::Legacy, 100_000, 100_000)
                .sample(1, 1, dims(), ramp(4, 10.0, 1.0))
                .sample(1, 2, dims(), ramp(4, 10.0, 1.0)),
        );
        assert_eq!((table.batch_count(), table.subbatch_count()), (100_000, 100_000));
        // 2-1 aliases 1-2 (offset 2)
        assert_eq!(
            table.samples(),
            vec![
                SampleKey::new(1, 1),
                SampleKey::new(1, 2),
                SampleKey::new(2, 1)
            ]
        );
    }

    #[test]
    fn equal_products_alias_the_same_block() {
        let table = parse(
            &ExportBuilder::new(Variant::Legacy, 3, 3).sample(2, 3, dims(), ramp(6, 30.0, 3.0)),
        );
        assert_eq!(sample_offset(2, 3), sample_offset(3, 2));
        assert_eq!(table.has_sample(2, 3), table.has_sample(3, 2));
        assert_eq!(table.raw(2, 3).unwrap(), table.raw(3, 2).unwrap());
        assert_eq!(table.dimensions(2, 3).unwrap(), table.dimensions(3, 2).unwrap());
    }

    #[test]
    fn curve_applies_truncation() {
        let table = parse(
            &ExportBuilder::new(Variant::Legacy, 1, 1).sample(1, 1, dims(), ramp(10, 10.0, 1.0)),
        );
        assert_eq!(table.curve(1, 1, Some(50)).unwrap().len(), 5);
        assert_eq!(table.curve(1, 1, Some(0)).unwrap().len(), 0);
        assert_eq!(table.curve(1, 1, None).unwrap().len(), 10);
    }

    #[test]
    fn rejects_bad_counts() {
        let text = "name,a.xtak\r\n\r\nx,\r\n\r\nmeta,\r\ncount,0,1\r\n\r\n";
        let err = Table::from_bytes(text.as_bytes(), Path::new("a.csv"), "a").unwrap_err();
        assert!(matches!(err, FormatError::NonPositiveCount { .. }));

        let text = "name,a.xtak\r\n\r\nx,\r\n\r\nmeta,\r\ncount,two,1\r\n\r\n";
        let err = Table::from_bytes(text.as_bytes(), Path::new("a.csv"), "a").unwrap_err();
        assert!(matches!(err, FormatError::InvalidNumber { .. }));
    }

    #[test]
    fn tables_can_be_shared_across_threads() {
        fn assert_shareable<T: Send + Sync>() {}
        assert_shareable::<Table>();
    }

    #[test]
    fn missing_file_is_format_error() {
        let err = Table::open(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }

    #[test]
    fn non_numeric_reading_is_format_error() {
        let text = "name,a.xtak\r\n\r\nx,\r\n\r\nmeta,,,\r\ncount,1,1\r\nh,,,\r\n0,1,1,1\r\n1,1,1,1\r\n\r\nb0\r\n\r\nh\r\nh\r\nh\r\n0,abc,1\r\n\r\n";
        let table = Table::from_bytes(text.as_bytes(), Path::new("a.csv"), "a").unwrap();
        assert!(table.has_sample(1, 1));
        assert!(matches!(
            table.curve(1, 1, None),
            Err(SampleError::Format(FormatError::InvalidNumber { what: "force", .. }))
        ));
    }
}
