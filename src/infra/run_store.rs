// ============================================================
// Layer 6 — Run Store
// ============================================================
// Everything an experiment leaves behind, as JSON, in one
// output directory:
//
//   out_dir/
//     experiment_config.json   ← the ExperimentConfig that was run
//     dmap.json                ← symbol list, in id order
//     <stage>_architecture.json← Burn config of each trained model
//     <stage>_metrics.csv      ← per-epoch metrics (MetricsLogger)
//     <stage>_history.json     ← per-epoch metrics (TrainingHistory)
//     <stage>_evaluation.json  ← test-set results
//
// The architecture description is written with Burn's own
// Config::save so it can be loaded back with Config::load.
// Model weights are not written.

use anyhow::{Context, Result};
use burn::config::Config;
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::vocab::Dmap;
use crate::infra::metrics::{MetricsLogger, TrainingHistory};
use crate::ml::evaluator::Evaluation;

pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        self.write_json("experiment_config.json", cfg)
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_json("experiment_config.json")
    }

    pub fn save_dmap(&self, dmap: &Dmap) -> Result<()> {
        self.write_json("dmap.json", dmap)
    }

    pub fn load_dmap(&self) -> Result<Dmap> {
        self.read_json("dmap.json")
    }

    /// Write a model's Burn config as `<stage>_architecture.json`.
    pub fn save_architecture<C: Config>(&self, stage: &str, config: &C) -> Result<()> {
        let path = self.dir.join(format!("{stage}_architecture.json"));
        config
            .save(&path)
            .with_context(|| format!("Cannot write architecture to '{}'", path.display()))?;
        tracing::debug!("Saved architecture to '{}'", path.display());
        Ok(())
    }

    pub fn load_architecture<C: Config>(&self, stage: &str) -> Result<C> {
        let path = self.dir.join(format!("{stage}_architecture.json"));
        C::load(&path).with_context(|| format!("Cannot load architecture from '{}'", path.display()))
    }

    pub fn save_history(&self, stage: &str, history: &TrainingHistory) -> Result<()> {
        self.write_json(&format!("{stage}_history.json"), history)
    }

    pub fn save_evaluation(&self, stage: &str, evaluation: &Evaluation) -> Result<()> {
        self.write_json(&format!("{stage}_evaluation.json"), evaluation)
    }

    pub fn load_evaluation(&self, stage: &str) -> Result<Evaluation> {
        self.read_json(&format!("{stage}_evaluation.json"))
    }

    /// CSV logger for one training stage.
    pub fn metrics_logger(&self, stage: &str) -> Result<MetricsLogger> {
        MetricsLogger::new(&self.dir, &format!("{stage}_metrics.csv"))
    }

    fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        let path = self.dir.join(file_name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::ExperimentConfig;
    use crate::infra::metrics::MetricMap;
    use crate::ml::architectures::ScalarPredictionConfig;
    use crate::ml::encoder::EncoderConfig;
    use crate::ml::recurrent::RecurrentKind;

    #[test]
    fn test_dmap_and_evaluation_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("run")).unwrap();

        let dmap = Dmap::new(-3..=3, &["+".to_string()]);
        store.save_dmap(&dmap).unwrap();
        assert_eq!(store.load_dmap().unwrap(), dmap);

        let evaluation = Evaluation {
            results: vec![("L5".to_string(), MetricMap::from([("loss".to_string(), 0.5)]))],
        };
        store.save_evaluation("main", &evaluation).unwrap();
        assert_eq!(store.load_evaluation("main").unwrap().get("L5").unwrap()["loss"], 0.5);
    }

    #[test]
    fn test_architecture_is_a_burn_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let cfg = ScalarPredictionConfig::new(EncoderConfig::new(26, 2, 15, RecurrentKind::Lstm))
            .with_fix_embeddings(true);
        store.save_architecture("main", &cfg).unwrap();

        let loaded: ScalarPredictionConfig = store.load_architecture("main").unwrap();
        assert_eq!(loaded.encoder.size_hidden, 15);
        assert_eq!(loaded.encoder.recurrent, RecurrentKind::Lstm);
        assert!(loaded.fix_embeddings);
    }

    #[test]
    fn test_experiment_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let cfg = ExperimentConfig { epochs: 7, size_hidden: 12, ..ExperimentConfig::default() };
        store.save_config(&cfg).unwrap();

        let loaded: ExperimentConfig = store.load_config().unwrap();
        assert_eq!(loaded.epochs, 7);
        assert_eq!(loaded.size_hidden, 12);
        assert_eq!(loaded.architecture, cfg.architecture);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        assert!(store.load_dmap().is_err());
    }
}
