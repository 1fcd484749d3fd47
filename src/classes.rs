//! Class id -> label mapping.

use std::path::Path;

use anyhow::{Context, Result};

/// Labels the shipped model was trained on, in class-id order.
pub const DEFAULT_CLASS_NAMES: [&str; 3] = ["fireextinguisher", "toolbox", "oxygen tank"];

/// File looked up in the working directory when no class file is configured.
pub const DEFAULT_CLASSES_FILE: &str = "classes.txt";

/// Ordered label list; the index of a label is its class id.
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassTable {
    labels: Vec<String>,
}

impl ClassTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { labels: Vec::new() }
    }

    pub fn safety_equipment() -> Self {
        Self::new(DEFAULT_CLASS_NAMES)
    }

    /// Parse a class file: one label per line, surrounding whitespace trimmed,
    /// blank lines skipped.
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class file {}", path.display()))?;
        let table = Self::parse(&raw);
        if table.is_empty() {
            log::warn!(
                "class file {} has no labels; every detection will be rejected",
                path.display()
            );
        }
        Ok(table)
    }

    /// Explicit path if given, else `classes.txt` in the working directory if it
    /// exists, else the built-in safety equipment labels.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CLASSES_FILE);
        if fallback.is_file() {
            return Self::load(fallback);
        }
        Ok(Self::safety_equipment())
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn contains(&self, class_id: usize) -> bool {
        class_id < self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
