use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// TableId – identity of one parsed export
// ---------------------------------------------------------------------------

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier handed out when a file is parsed. Re-parsing the same file
/// yields a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(u64);

impl TableId {
    pub(crate) fn next() -> Self {
        TableId(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sample coordinates
// ---------------------------------------------------------------------------

/// (batch, subbatch) of one specimen within a table. Both are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleKey {
    pub batch: u32,
    pub subbatch: u32,
}

impl SampleKey {
    pub fn new(batch: u32, subbatch: u32) -> Self {
        Self { batch, subbatch }
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.batch, self.subbatch)
    }
}

/// A sample coordinate resolved against a live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleRef {
    pub table: TableId,
    pub key: SampleKey,
}

impl SampleRef {
    pub fn new(table: TableId, batch: u32, subbatch: u32) -> Self {
        Self {
            table,
            key: SampleKey::new(batch, subbatch),
        }
    }
}

/// Percentage of leading points kept; `None` keeps the whole curve.
pub type Truncation = Option<u8>;

// ---------------------------------------------------------------------------
// Raw and derived series
// ---------------------------------------------------------------------------

/// Specimen geometry as recorded by the instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub thickness: f64,
    pub width: f64,
    pub length: f64,
}

impl Dimensions {
    /// Cross-section the force is spread over.
    pub fn area(&self) -> f64 {
        self.thickness * self.width
    }
}

/// Force/elongation columns exactly as exported.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCurve {
    pub force: Vec<f64>,
    pub elongation: Vec<f64>,
}

impl RawCurve {
    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }
}

/// Stress/strain series of one sample. Recomputed on every request and
/// never stored in a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    /// Strain axis (x).
    pub strain: Vec<f64>,
    /// Stress axis (y) – same length as `strain`.
    pub stress: Vec<f64>,
}

impl Curve {
    pub fn new(strain: Vec<f64>, stress: Vec<f64>) -> Self {
        debug_assert_eq!(strain.len(), stress.len());
        Self { strain, stress }
    }

    /// Normalise raw readings: stress = force / (thickness × width),
    /// strain = elongation / length.
    pub fn from_raw(raw: &RawCurve, dims: &Dimensions) -> Self {
        let area = dims.area();
        Self {
            strain: raw.elongation.iter().map(|e| e / dims.length).collect(),
            stress: raw.force.iter().map(|f| f / area).collect(),
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.strain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain.is_empty()
    }

    /// `(strain, stress)` pairs, convenient for plotting.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.strain.iter().copied().zip(self.stress.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_normalises_by_geometry() {
        let raw = RawCurve {
            force: vec![0.0, 20.0, 40.0],
            elongation: vec![0.0, 0.5, 1.0],
        };
        let dims = Dimensions {
            thickness: 2.0,
            width: 5.0,
            length: 50.0,
        };
        let curve = Curve::from_raw(&raw, &dims);
        assert_eq!(curve.stress, vec![0.0, 2.0, 4.0]);
        assert_eq!(curve.strain, vec![0.0, 0.01, 0.02]);
    }

    #[test]
    fn table_ids_are_unique() {
        let a = TableId::next();
        let b = TableId::next();
        assert_ne!(a, b);
    }
}
