// ============================================================
// Layer 6 — Metrics
// ============================================================
// Three pieces:
//
//   MetricTotals     — running (sum, weight) per metric while a
//                      pass over the data is in progress
//   TrainingHistory  — per-epoch averages for the training and
//                      validation sets, kept in memory
//   MetricsLogger    — appends every epoch to a CSV file
//
// CSV layout (long format, one row per value):
//
//   epoch,split,metric,value
//   1,train,loss,12.345600
//   1,validation,loss,11.980000
//   1,train,mean_absolute_error,2.871000
//   ...

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Metric name → averaged value.
pub type MetricMap = BTreeMap<String, f64>;

/// Weighted sums accumulated over batches.
#[derive(Debug, Clone, Default)]
pub struct MetricTotals {
    totals: BTreeMap<String, (f64, f64)>,
}

impl MetricTotals {
    /// Add `sum` spread over `weight` observations.
    pub fn add(&mut self, name: impl Into<String>, sum: f64, weight: f64) {
        let entry = self.totals.entry(name.into()).or_insert((0.0, 0.0));
        entry.0 += sum;
        entry.1 += weight;
    }

    pub fn merge(&mut self, other: MetricTotals) {
        for (name, (sum, weight)) in other.totals {
            self.add(name, sum, weight);
        }
    }

    pub fn averages(&self) -> MetricMap {
        self.totals
            .iter()
            .map(|(name, &(sum, weight))| {
                let avg = if weight > 0.0 { sum / weight } else { f64::NAN };
                (name.clone(), avg)
            })
            .collect()
    }
}

/// Averages for one epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,
    pub train: MetricMap,
    pub validation: Option<MetricMap>,
}

impl EpochMetrics {
    pub fn train_loss(&self) -> f64 {
        self.train.get("loss").copied().unwrap_or(f64::NAN)
    }

    pub fn val_loss(&self) -> Option<f64> {
        self.validation.as_ref().and_then(|m| m.get("loss").copied())
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss().is_some_and(|v| v < best_val_loss)
    }
}

/// Everything recorded during one call to `fit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn record(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// Training loss per epoch.
    pub fn losses(&self) -> Vec<f64> {
        self.epochs.iter().map(EpochMetrics::train_loss).collect()
    }

    /// Validation loss per epoch (empty when there was no validation set).
    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().filter_map(EpochMetrics::val_loss).collect()
    }

    /// (epoch, loss) of the lowest validation loss.
    pub fn best_val_loss(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for e in &self.epochs {
            if e.is_improvement(best.map_or(f64::INFINITY, |b| b.1)) {
                best = e.val_loss().map(|v| (e.epoch, v));
            }
        }
        best
    }

    /// Final metrics for training and validation set, one line each.
    pub fn summary(&self) -> String {
        let Some(last) = self.last() else {
            return "Model not trained yet".to_string();
        };
        let mut out = format!("Metrics for training set:\t{}", format_metrics(&last.train));
        if let Some(val) = &last.validation {
            out.push_str(&format!("\nMetrics for validation set:\t{}", format_metrics(val)));
        }
        out
    }
}

pub fn format_metrics(metrics: &MetricMap) -> String {
    metrics
        .iter()
        .map(|(name, value)| format!("{name}: {value:.6}"))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger writing to `dir/file_name`.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(file_name);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,split,metric,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics, one row per (split, metric).
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let splits = std::iter::once(("train", &m.train))
            .chain(m.validation.as_ref().map(|v| ("validation", v)));
        for (split, metrics) in splits {
            for (name, value) in metrics {
                writeln!(f, "{},{},{},{:.6}", m.epoch, split, name, value)?;
            }
        }

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss(),
            m.val_loss(),
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, train_loss: f64, val_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train:      MetricMap::from([("loss".to_string(), train_loss)]),
            validation: Some(MetricMap::from([("loss".to_string(), val_loss)])),
        }
    }

    #[test]
    fn test_weighted_averages() {
        let mut totals = MetricTotals::default();
        totals.add("loss", 10.0, 4.0);
        let mut other = MetricTotals::default();
        other.add("loss", 2.0, 1.0);
        other.add("binary_accuracy", 0.0, 0.0);
        totals.merge(other);

        let avg = totals.averages();
        assert_eq!(avg["loss"], 2.4);
        assert!(avg["binary_accuracy"].is_nan());
    }

    #[test]
    fn test_is_improvement() {
        let m = epoch(2, 2.5, 2.3);
        // 2.3 < 3.0 → this is an improvement
        assert!(m.is_improvement(3.0));
        // 2.3 is NOT less than 2.0 → not an improvement
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_history_curves_and_best() {
        let mut history = TrainingHistory::default();
        history.record(epoch(1, 5.0, 4.0));
        history.record(epoch(2, 3.0, 2.0));
        history.record(epoch(3, 2.0, 2.5));

        assert_eq!(history.losses(), vec![5.0, 3.0, 2.0]);
        assert_eq!(history.val_losses(), vec![4.0, 2.0, 2.5]);
        assert_eq!(history.best_val_loss(), Some((2, 2.0)));
        assert!(history.summary().contains("validation set"));
    }

    #[test]
    fn test_untrained_summary() {
        assert_eq!(TrainingHistory::default().summary(), "Model not trained yet");
    }

    #[test]
    fn test_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), "metrics.csv").unwrap();
        logger.log(&epoch(1, 1.5, 1.25)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            "epoch,split,metric,value",
            "1,train,loss,1.500000",
            "1,validation,loss,1.250000",
        ]);
    }
}
