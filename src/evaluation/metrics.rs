use crate::evaluation::detection_record::DetectionRecord;
use itertools::{Itertools, MinMaxResult};
use std::fmt;

/// Counts of actual (`mine_present`) against predicted (`mine_detected`) labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut matrix = ConfusionMatrix::default();
        for (&actual, &predicted) in y_true.iter().zip(y_pred) {
            match (actual, predicted) {
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (true, true) => matrix.true_positive += 1,
            }
        }
        matrix
    }

    /// Rows are the actual class, columns the predicted class, negatives first.
    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (precision, recall) = (self.precision(), self.recall());
        if precision + recall == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / (precision + recall)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [[tn, fp], [fn_, tp]] = self.as_array();
        let width = [tn, fp, fn_, tp].iter().map(|v| v.to_string().len()).max().unwrap_or(1);
        write!(f, "[[{tn:>width$} {fp:>width$}]\n [{fn_:>width$} {tp:>width$}]]")
    }
}

/// Mean, max and min of the `prob` values of detected records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilitySummary {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl ProbabilitySummary {
    /// None when there is nothing to summarise.
    pub fn from_probabilities(probabilities: &[f64]) -> Option<Self> {
        let (min, max) = match probabilities.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(value) => (value, value),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
        Some(ProbabilitySummary { count: probabilities.len(), mean, max, min })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsReport {
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// None means no record was detected.
    pub probability: Option<ProbabilitySummary>,
}

impl MetricsReport {
    pub fn record_count(&self) -> usize {
        self.confusion.total()
    }
}

/// Scores a result document, one sample per record.
///
/// Records of images with several boxes are counted once per box. Records whose image could
/// not be georeferenced still count, since detection and ground truth do not depend on it.
pub fn analyze_records(records: &[DetectionRecord]) -> MetricsReport {
    let y_true: Vec<bool> = records.iter().map(|r| r.mine_present).collect();
    let y_pred: Vec<bool> = records.iter().map(|r| r.mine_detected).collect();
    let probabilities: Vec<f64> = records
        .iter()
        .filter(|r| r.mine_detected)
        .filter_map(|r| r.prob)
        .collect();

    let confusion = ConfusionMatrix::from_labels(&y_true, &y_pred);
    MetricsReport {
        confusion,
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1: confusion.f1(),
        probability: ProbabilitySummary::from_probabilities(&probabilities),
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Performance Metrics:")?;
        writeln!(f, "Precision: {:.2}", self.precision)?;
        writeln!(f, "Recall: {:.2}", self.recall)?;
        writeln!(f, "F1-Score: {:.2}", self.f1)?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        writeln!(f, "{}", self.confusion)?;
        writeln!(f)?;
        match &self.probability {
            Some(summary) => {
                writeln!(f, "Detection Probability Statistics:")?;
                writeln!(f, "Mean Probability: {:.2}", summary.mean)?;
                writeln!(f, "Max Probability: {:.2}", summary.max)?;
                write!(f, "Min Probability: {:.2}", summary.min)
            }
            None => write!(f, "Detection Probability Statistics: no detections"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(present: bool, detected: bool, prob: Option<f64>) -> DetectionRecord {
        let mut record = DetectionRecord::negative("img.tiff", present);
        if detected {
            record.mine_detected = true;
            record.lat = Some(0.0);
            record.lon = Some(0.0);
            record.prob = prob;
            record.conf = prob.map(|p| p / 100.0);
        }
        record
    }

    #[test]
    fn one_of_each_outcome() {
        let records = vec![
            record(true, true, Some(80.0)),
            record(true, false, None),
            record(false, true, Some(40.0)),
            record(false, false, None),
        ];
        let report = analyze_records(&records);
        assert_eq!(
            report.confusion,
            ConfusionMatrix { true_negative: 1, false_positive: 1, false_negative: 1, true_positive: 1 }
        );
        assert_eq!(report.precision, 0.5);
        assert_eq!(report.recall, 0.5);
        assert_eq!(report.f1, 0.5);
        assert_eq!(
            report.probability,
            Some(ProbabilitySummary { count: 2, mean: 60.0, max: 80.0, min: 40.0 })
        );
    }

    #[test]
    fn nothing_detected_scores_zero() {
        let records = vec![record(true, false, None), record(false, false, None)];
        let report = analyze_records(&records);
        assert_eq!((report.precision, report.recall, report.f1), (0.0, 0.0, 0.0));
        assert_eq!(report.probability, None);
        assert!(report.to_string().ends_with("no detections"));
    }

    #[test]
    fn empty_document_does_not_panic() {
        let report = analyze_records(&[]);
        assert_eq!(report.record_count(), 0);
        assert_eq!((report.precision, report.recall, report.f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn perfect_detector() {
        let records = vec![record(true, true, Some(90.0)), record(false, false, None)];
        let report = analyze_records(&records);
        assert_eq!((report.precision, report.recall, report.f1), (1.0, 1.0, 1.0));
        assert_eq!(report.confusion.as_array(), [[1, 0], [0, 1]]);
    }

    #[test]
    fn ungeocoded_detections_still_count() {
        let mut detected = record(true, true, Some(70.0));
        detected.lat = None;
        detected.lon = None;
        detected.geo_error = Some("unreadable".to_string());
        let report = analyze_records(&[detected]);
        assert_eq!(report.confusion.true_positive, 1);
        assert_eq!(report.probability.map(|p| p.count), Some(1));
    }

    #[test]
    fn matrix_prints_like_a_numpy_array() {
        let matrix = ConfusionMatrix { true_negative: 12, false_positive: 3, false_negative: 0, true_positive: 7 };
        assert_eq!(matrix.to_string(), "[[12  3]\n [ 0  7]]");
    }

    #[test]
    fn report_uses_two_decimals() {
        let records = vec![record(true, true, Some(87.3456)), record(false, true, Some(12.0))];
        let text = analyze_records(&records).to_string();
        assert!(text.contains("Precision: 0.50"));
        assert!(text.contains("Recall: 1.00"));
        assert!(text.contains("F1-Score: 0.67"));
        assert!(text.contains("Max Probability: 87.35"));
        assert!(text.contains("Min Probability: 12.00"));
    }
}
