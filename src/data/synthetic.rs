//! Writer for synthetic instrument exports.
//!
//! Produces files with the same sub-table grid the parser reads, for both
//! instrument variants. Used by the `generate_sample` binary and by tests.

use std::collections::BTreeMap;
use std::path::Path;

use encoding_rs::SHIFT_JIS;

use super::model::{Dimensions, RawCurve};
use super::table::{sample_offset, Variant, DATA_HEADER_ROWS, DIMENSION_ROW_BASE};

/// Builder for one export file.
///
/// Samples are placed by the instrument's `batch × subbatch` offset, so
/// adding two samples with the same product overwrites the first.
#[derive(Debug, Clone)]
pub struct ExportBuilder {
    variant: Variant,
    source_name: String,
    batch_count: u32,
    subbatch_count: u32,
    samples: BTreeMap<usize, (Dimensions, RawCurve)>,
}

impl ExportBuilder {
    pub fn new(variant: Variant, batch_count: u32, subbatch_count: u32) -> Self {
        Self {
            variant,
            source_name: "specimen".to_string(),
            batch_count,
            subbatch_count,
            samples: BTreeMap::new(),
        }
    }

    /// Base name written into the file-extension hint cell.
    pub fn source_name(mut self, name: &str) -> Self {
        self.source_name = name.to_string();
        self
    }

    pub fn sample(mut self, batch: u32, subbatch: u32, dims: Dimensions, raw: RawCurve) -> Self {
        self.samples
            .insert(sample_offset(batch, subbatch), (dims, raw));
        self
    }

    /// Render the sub-table grid as text.
    pub fn to_text(&self) -> String {
        let layout = self.variant.layout();
        let last_offset = self.samples.keys().next_back().copied().unwrap_or(0);

        let mut tables: Vec<Vec<String>> = Vec::new();

        // Sub-table 0: file information with the extension hint.
        tables.push(vec![
            "ファイル情報,".to_string(),
            format!("ファイル名,{}{}", self.source_name, self.variant.hint()),
        ]);

        // Sub-table 1: test conditions; variant B stores the counts here.
        let mut conditions = vec!["試験条件,".to_string()];
        match self.variant {
            Variant::Legacy => conditions.push("試験種類,引張".to_string()),
            Variant::VariantB => conditions.push(format!(
                "バッチ数,{} _ {}",
                self.batch_count, self.subbatch_count
            )),
        }
        tables.push(conditions);

        if self.variant == Variant::VariantB {
            tables.push(vec!["装置情報,".to_string(), "ロードセル,5kN".to_string()]);
        }

        // Metadata sub-table: counts (legacy) and one dimension row per offset.
        let mut meta = vec![
            "試料情報,,,".to_string(),
            match self.variant {
                Variant::Legacy => format!("数,{},{}", self.batch_count, self.subbatch_count),
                Variant::VariantB => "数,,".to_string(),
            },
            "名前,厚さ,幅,標点間距離".to_string(),
        ];
        debug_assert_eq!(meta.len(), DIMENSION_ROW_BASE);
        for offset in 0..=last_offset {
            match self.samples.get(&offset) {
                Some((dims, _)) => meta.push(format!(
                    "{offset},{},{},{}",
                    dims.thickness, dims.width, dims.length
                )),
                None => meta.push(format!("{offset},1,1,1")),
            }
        }
        tables.push(meta);
        debug_assert_eq!(tables.len(), layout.data_table_base);

        // One data sub-table per offset, starting at offset 0.
        for offset in 0..=last_offset {
            let mut block = vec![
                format!("試料,{offset},"),
                "時間,試験力,ストローク".to_string(),
                "sec,N,mm".to_string(),
            ];
            debug_assert_eq!(block.len(), DATA_HEADER_ROWS);
            if let Some((_, raw)) = self.samples.get(&offset) {
                for (i, (f, e)) in raw.force.iter().zip(&raw.elongation).enumerate() {
                    block.push(format!("{},{f},{e}", i as f64 * 0.1));
                }
            }
            tables.push(block);
        }

        let mut text = String::new();
        for table in &tables {
            for row in table {
                text.push_str(row);
                text.push_str("\r\n");
            }
            text.push_str("\r\n");
        }
        text
    }

    /// Shift-JIS encoded file contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        let text = self.to_text();
        let (bytes, _, _) = SHIFT_JIS.encode(&text);
        bytes.into_owned()
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }
}

/// A rising-then-softening curve with `points` readings, handy for tests
/// and demo files.
pub fn ramp(points: usize, peak_force: f64, max_elongation: f64) -> RawCurve {
    let last = points.saturating_sub(1).max(1) as f64;
    let elongation: Vec<f64> = (0..points).map(|i| max_elongation * i as f64 / last).collect();
    let force = (0..points)
        .map(|i| {
            let t = i as f64 / last;
            peak_force * (1.0 - (1.0 - t * 1.25).powi(2)).max(0.0)
        })
        .collect();
    RawCurve { force, elongation }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_shift_jis_encoded_text() {
        let builder = ExportBuilder::new(Variant::Legacy, 1, 1).sample(
            1,
            1,
            Dimensions {
                thickness: 1.0,
                width: 2.0,
                length: 3.0,
            },
            ramp(4, 10.0, 1.0),
        );
        let bytes = builder.to_bytes();
        // multi-byte labels must not be written as UTF-8
        assert!(std::str::from_utf8(&bytes).is_err());

        let (decoded, _, had_errors) = SHIFT_JIS.decode(&bytes);
        assert!(!had_errors);
        assert_eq!(decoded, builder.to_text());
    }
}
