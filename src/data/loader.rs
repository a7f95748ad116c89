// ============================================================
// Layer 4 — Expression Loader
// ============================================================
// Reads arithmetic expressions from plain text:
//
//   # comment lines and blank lines are ignored
//   ( 5 - ( 2 + 3 ) )
//   ( -4 + 7 )
//
// The path may be a single file or a directory; for a directory
// every `.txt` file is read, in file-name order.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::expression::Expression;
use crate::domain::traits::ExpressionSource;

/// Loads expressions from a file or a directory of `.txt` files.
pub struct ExpressionLoader {
    path: PathBuf,
}

impl ExpressionLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExpressionSource for ExpressionLoader {
    fn load_all(&self) -> Result<Vec<Expression>> {
        if !self.path.exists() {
            anyhow::bail!("Expression source '{}' does not exist", self.path.display());
        }

        let files = if self.path.is_dir() {
            let mut files: Vec<PathBuf> = fs::read_dir(&self.path)
                .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
                .collect();
            files.sort();
            files
        } else {
            vec![self.path.clone()]
        };

        let mut expressions = Vec::new();
        for file in &files {
            expressions.extend(load_single_file(file)?);
        }

        tracing::info!(
            "Loaded {} expressions from '{}'",
            expressions.len(),
            self.path.display()
        );
        Ok(expressions)
    }

    fn name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("expressions")
            .to_string()
    }
}

/// Parse every expression line of a single file.
/// A malformed line fails the whole load.
fn load_single_file(path: &Path) -> Result<Vec<Expression>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let mut expressions = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let expression = Expression::parse(line)
            .with_context(|| format!("Malformed expression on line {} of '{}'", n + 1, path.display()))?;
        expressions.push(expression);
    }

    tracing::debug!("{}: {} expressions", path.display(), expressions.len());
    Ok(expressions)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_file_skipping_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# training set").unwrap();
        writeln!(file, "( 1 + 2 )").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "( 5 - ( 2 - 3 ) )").unwrap();

        let loaded = ExpressionLoader::new(file.path()).load_all().unwrap();
        let values: Vec<i64> = loaded.iter().map(Expression::value).collect();
        assert_eq!(values, vec![3, 6]);
    }

    #[test]
    fn test_malformed_line_reports_file_and_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# training set").unwrap();
        writeln!(file, "( 1 + 2 )").unwrap();
        writeln!(file, "( 1 + ").unwrap();

        let err = ExpressionLoader::new(file.path()).load_all().unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 3"), "{message}");
        assert!(message.contains(&file.path().display().to_string()), "{message}");
    }

    #[test]
    fn test_loads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "2\n").unwrap();
        fs::write(dir.path().join("a.txt"), "1\n").unwrap();
        fs::write(dir.path().join("ignored.csv"), "3\n").unwrap();

        let loaded = ExpressionLoader::new(dir.path()).load_all().unwrap();
        let values: Vec<i64> = loaded.iter().map(Expression::value).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let loader = ExpressionLoader::new("/nonexistent/expressions.txt");
        assert!(loader.load_all().is_err());
        assert_eq!(loader.name(), "expressions");
    }
}
