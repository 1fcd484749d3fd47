use std::collections::BTreeMap;

use serde::Serialize;

use crate::classes::ClassTable;

/// Per-frame summary of accepted detections.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub total_detections: usize,
    pub counts_by_class: BTreeMap<String, usize>,
    /// Confidences in the order detections were accepted.
    pub confidences: Vec<f32>,
}

impl FrameStats {
    pub fn record(&mut self, label: &str, confidence: f32) {
        self.total_detections += 1;
        *self.counts_by_class.entry(label.to_string()).or_insert(0) += 1;
        self.confidences.push(confidence);
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts_by_class.get(label).copied().unwrap_or(0)
    }

    /// Counts for every label of the table, zero for labels not seen.
    pub fn counts_for_table(&self, classes: &ClassTable) -> BTreeMap<String, usize> {
        classes
            .labels()
            .iter()
            .map(|label| (label.clone(), self.count(label)))
            .collect()
    }

    /// `"2 toolbox, 1 fireextinguisher"`, largest count first.
    pub fn summary(&self) -> String {
        if self.total_detections == 0 {
            return "no detections".to_string();
        }
        let mut entries: Vec<_> = self.counts_by_class.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
            .into_iter()
            .map(|(label, count)| format!("{} {}", count, label))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
