use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use tentackle::data::{SampleRef, TableId};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize, lightness: f32) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, lightness);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: sample → Color32
// ---------------------------------------------------------------------------

/// One hue per table; samples of the same table get lighter and darker
/// shades of it.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<SampleRef, Color32>,
}

impl ColorMap {
    pub fn new(samples: &[SampleRef]) -> Self {
        let mut by_table: BTreeMap<TableId, Vec<SampleRef>> = BTreeMap::new();
        for s in samples {
            by_table.entry(s.table).or_default().push(*s);
        }

        let hues = generate_palette(by_table.len(), 0.55);
        let mut mapping = BTreeMap::new();
        for ((_, members), base) in by_table.iter().zip(hues) {
            if members.len() == 1 {
                mapping.insert(members[0], base);
                continue;
            }
            for (i, sample) in members.iter().enumerate() {
                let t = i as f32 / (members.len() - 1) as f32;
                mapping.insert(*sample, shade(base, 0.75 + 0.5 * t));
            }
        }
        ColorMap { mapping }
    }

    pub fn color_for(&self, sample: &SampleRef) -> Color32 {
        self.mapping
            .get(sample)
            .copied()
            .unwrap_or(Color32::LIGHT_BLUE)
    }
}

fn shade(color: Color32, factor: f32) -> Color32 {
    let scale = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
    Color32::from_rgb(scale(color.r()), scale(color.g()), scale(color.b()))
}
