//! Aggregate mechanical properties over a set of samples.

use std::collections::BTreeMap;
use std::fmt;

use crate::cache::ActiveSample;
use crate::config::Config;
use crate::data::curve;
use crate::data::model::{Curve, SampleRef};
use crate::error::ComputationError;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    YoungsModulus,
    UltimateStrength,
    StrainAtMaxStress,
    StrainAtBreak,
    Toughness,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::YoungsModulus,
        Metric::UltimateStrength,
        Metric::StrainAtMaxStress,
        Metric::StrainAtBreak,
        Metric::Toughness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::YoungsModulus => "Young's modulus",
            Metric::UltimateStrength => "UTS",
            Metric::StrainAtMaxStress => "Strain at UTS",
            Metric::StrainAtBreak => "Strain at break",
            Metric::Toughness => "Toughness",
        }
    }

    /// Whether the metric is a stress (scaled by `y_scaling`) rather than a
    /// strain (scaled by `x_scaling`).
    fn is_stress(self) -> bool {
        matches!(
            self,
            Metric::YoungsModulus | Metric::UltimateStrength | Metric::Toughness
        )
    }

    fn unit(self, config: &Config) -> &str {
        if self.is_stress() {
            &config.axis.y_unit
        } else {
            &config.axis.x_unit
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean and population standard deviation of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistic {
    pub mean: f64,
    pub std_dev: f64,
    pub unit: String,
    pub count: usize,
}

impl Statistic {
    pub fn from_values(values: &[f64], unit: &str) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            unit: unit.to_string(),
            count: values.len(),
        })
    }
}

/// Properties of one curve, already divided by the configured scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMetrics {
    pub sample: SampleRef,
    pub label: String,
    /// `None` when the regression window is degenerate for this curve.
    pub youngs_modulus: Option<f64>,
    pub ultimate_strength: f64,
    pub strain_at_max_stress: f64,
    pub strain_at_break: f64,
    pub toughness: f64,
}

impl SampleMetrics {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::YoungsModulus => self.youngs_modulus,
            Metric::UltimateStrength => Some(self.ultimate_strength),
            Metric::StrainAtMaxStress => Some(self.strain_at_max_stress),
            Metric::StrainAtBreak => Some(self.strain_at_break),
            Metric::Toughness => Some(self.toughness),
        }
    }
}

/// Per-sample metrics and their aggregate.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub samples: Vec<SampleMetrics>,
    /// Only metrics with at least one value are present.
    pub statistics: BTreeMap<Metric, Statistic>,
}

impl AnalysisReport {
    pub fn statistic(&self, metric: Metric) -> Option<&Statistic> {
        self.statistics.get(&metric)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<18} {:>14} {:>14}  unit  (n)", "metric", "mean", "std dev")?;
        for (metric, stat) in &self.statistics {
            writeln!(
                f,
                "{:<18} {:>14.6} {:>14.6}  {:<4}  ({})",
                metric.label(),
                stat.mean,
                stat.std_dev,
                stat.unit,
                stat.count
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Compute the metrics of a single curve.
pub fn evaluate(
    sample: SampleRef,
    label: String,
    curve: &Curve,
    config: &Config,
) -> Result<SampleMetrics, ComputationError> {
    let y_scale = config.axis.y_scaling;
    let x_scale = config.axis.x_scaling;

    let (uts, strain_at_uts) = curve::max_stress(curve)?;
    let strain_at_break = curve::strain_at_break(curve)?;
    let youngs_modulus = match curve::linear_regression(curve, config.regression) {
        Ok(fit) => Some(fit.slope / y_scale),
        Err(e) => {
            log::warn!("{label}: no modulus, {e}");
            None
        }
    };

    Ok(SampleMetrics {
        sample,
        label,
        youngs_modulus,
        ultimate_strength: uts / y_scale,
        strain_at_max_stress: strain_at_uts / x_scale,
        strain_at_break: strain_at_break / x_scale,
        toughness: curve::integrate(curve, config.integration.method, y_scale),
    })
}

/// Evaluate every sample and aggregate. Samples whose curve cannot be built
/// are skipped with a warning.
pub fn analyze(
    samples: &[ActiveSample<'_>],
    config: &Config,
) -> Result<AnalysisReport, ComputationError> {
    if samples.is_empty() {
        return Err(ComputationError::EmptySelection);
    }

    let mut evaluated = Vec::with_capacity(samples.len());
    for sample in samples {
        let label = sample.label();
        let curve = match sample.curve() {
            Ok(curve) => curve,
            Err(e) => {
                log::warn!("{label}: skipped, {e}");
                continue;
            }
        };
        match evaluate(sample.sample_ref(), label, &curve, config) {
            Ok(metrics) => evaluated.push(metrics),
            Err(e) => log::warn!("{}: skipped, {e}", sample.label()),
        }
    }
    if evaluated.is_empty() {
        return Err(ComputationError::NoUsableSamples);
    }

    let statistics: BTreeMap<Metric, Statistic> = Metric::ALL
        .iter()
        .filter_map(|&metric| {
            let values: Vec<f64> = evaluated.iter().filter_map(|m| m.value(metric)).collect();
            Statistic::from_values(&values, metric.unit(config)).map(|s| (metric, s))
        })
        .collect();

    for (metric, stat) in &statistics {
        log::info!(
            "{metric} for selected samples: {:.6}, standard deviation: {:.6}",
            stat.mean,
            stat.std_dev
        );
    }

    Ok(AnalysisReport {
        samples: evaluated,
        statistics,
    })
}
