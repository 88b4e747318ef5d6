//! Span scoring for the B-/I-/O tag scheme.

use std::collections::{BTreeMap, HashSet};

use super::{SpanScore, SpanScorer};
use crate::error::{Error, Result};

/// One reconstructed entity span: `[start, end)` positions plus the entity
/// label without its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Span {
    start: usize,
    end: usize,
    label: String,
}

/// Reconstruct entity spans from a flat B-/I-/O tag sequence.
///
/// `B-X` opens a span of type `X`; `I-X` continues an open span of the same
/// type, and leniently opens one when none is open (common-practice reading
/// of files with dangling `I-` tags); anything else closes the open span.
fn extract_spans(tags: &[String]) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<Span> = None;

    for (pos, tag) in tags.iter().enumerate() {
        if let Some(label) = tag.strip_prefix("B-") {
            if let Some(span) = open.take() {
                spans.push(span);
            }
            open = Some(Span {
                start: pos,
                end: pos + 1,
                label: label.to_string(),
            });
        } else if let Some(label) = tag.strip_prefix("I-") {
            match open.as_mut() {
                Some(span) if span.label == label => span.end = pos + 1,
                _ => {
                    if let Some(span) = open.take() {
                        spans.push(span);
                    }
                    open = Some(Span {
                        start: pos,
                        end: pos + 1,
                        label: label.to_string(),
                    });
                }
            }
        } else if let Some(span) = open.take() {
            spans.push(span);
        }
    }

    if let Some(span) = open {
        spans.push(span);
    }

    spans
}

fn prf(tp: usize, pred: usize, truth: usize) -> SpanScore {
    let precision = if pred > 0 { tp as f64 / pred as f64 } else { 0.0 };
    let recall = if truth > 0 { tp as f64 / truth as f64 } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    SpanScore {
        precision,
        recall,
        f1,
    }
}

/// Span-level scorer for B-/I-/O tag sequences.
///
/// Micro-averaged: a predicted span counts as correct only when its start,
/// end and label all match a true span.
pub struct BioScorer;

impl BioScorer {
    fn check_lengths(y_true: &[String], y_pred: &[String]) -> Result<()> {
        if y_true.len() != y_pred.len() {
            return Err(Error::Shape(format!(
                "true and predicted sequences differ in length: {} vs {}",
                y_true.len(),
                y_pred.len()
            )));
        }
        Ok(())
    }
}

impl SpanScorer for BioScorer {
    fn score(&self, y_true: &[String], y_pred: &[String]) -> Result<SpanScore> {
        Self::check_lengths(y_true, y_pred)?;

        let true_spans = extract_spans(y_true);
        let pred_spans = extract_spans(y_pred);
        let truth: HashSet<&Span> = true_spans.iter().collect();
        let tp = pred_spans.iter().filter(|s| truth.contains(s)).count();

        Ok(prf(tp, pred_spans.len(), true_spans.len()))
    }

    fn report(&self, y_true: &[String], y_pred: &[String]) -> Result<String> {
        Self::check_lengths(y_true, y_pred)?;

        let true_spans = extract_spans(y_true);
        let pred_spans = extract_spans(y_pred);
        let truth: HashSet<&Span> = true_spans.iter().collect();

        // per-label counts, label-sorted for a stable table
        let mut labels: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
        for span in &true_spans {
            labels.entry(span.label.as_str()).or_default().2 += 1;
        }
        for span in &pred_spans {
            let entry = labels.entry(span.label.as_str()).or_default();
            entry.1 += 1;
            if truth.contains(span) {
                entry.0 += 1;
            }
        }

        let mut report = String::new();
        report.push_str(&format!(
            "{:>16} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        report.push_str(&"-".repeat(60));
        report.push('\n');

        for (label, &(tp, pred, support)) in &labels {
            let score = prf(tp, pred, support);
            report.push_str(&format!(
                "{label:>16} {:>10.2} {:>10.2} {:>10.2} {support:>10}\n",
                score.precision, score.recall, score.f1
            ));
        }

        report.push_str(&"-".repeat(60));
        report.push('\n');

        let tp_total = pred_spans.iter().filter(|s| truth.contains(s)).count();
        let micro = prf(tp_total, pred_spans.len(), true_spans.len());
        report.push_str(&format!(
            "{:>16} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
            "micro avg",
            micro.precision,
            micro.recall,
            micro.f1,
            true_spans.len()
        ));

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tags(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_simple_span() {
        let spans = extract_spans(&tags(&["O", "B-loc", "I-loc", "O"]));
        assert_eq!(
            spans,
            vec![Span {
                start: 1,
                end: 3,
                label: "loc".into()
            }]
        );
    }

    #[test]
    fn test_adjacent_b_tags_are_separate_spans() {
        let spans = extract_spans(&tags(&["B-per", "B-per"]));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].end, 1);
        assert_eq!(spans[1].start, 1);
    }

    #[test]
    fn test_dangling_i_opens_span() {
        let spans = extract_spans(&tags(&["O", "I-org", "I-org"]));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 1);
        assert_eq!(spans[0].end, 3);
        assert_eq!(spans[0].label, "org");
    }

    #[test]
    fn test_type_change_inside_i_run_splits() {
        let spans = extract_spans(&tags(&["B-per", "I-org"]));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, "per");
        assert_eq!(spans[1].label, "org");
    }

    #[test]
    fn test_trailing_span_is_closed_at_eof() {
        let spans = extract_spans(&tags(&["O", "B-loc"]));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 2);
    }

    #[test]
    fn test_no_entities_no_spans() {
        assert!(extract_spans(&tags(&["O", "O", "O"])).is_empty());
        assert!(extract_spans(&[]).is_empty());
    }

    #[test]
    fn test_perfect_prediction_scores_one() {
        let y = tags(&["B-loc", "I-loc", "O", "B-per"]);
        let score = BioScorer.score(&y, &y).unwrap();
        assert_relative_eq!(score.precision, 1.0);
        assert_relative_eq!(score.recall, 1.0);
        assert_relative_eq!(score.f1, 1.0);
    }

    #[test]
    fn test_partial_overlap_does_not_count() {
        // predicted span [0,1) vs true span [0,2): boundaries must match
        let y_true = tags(&["B-loc", "I-loc"]);
        let y_pred = tags(&["B-loc", "O"]);
        let score = BioScorer.score(&y_true, &y_pred).unwrap();
        assert_relative_eq!(score.f1, 0.0);
    }

    #[test]
    fn test_known_prf_values() {
        // true: spans at [0,1)x, [2,3)y — pred: [0,1)x, [2,3)z
        let y_true = tags(&["B-x", "O", "B-y"]);
        let y_pred = tags(&["B-x", "O", "B-z"]);
        let score = BioScorer.score(&y_true, &y_pred).unwrap();
        assert_relative_eq!(score.precision, 0.5);
        assert_relative_eq!(score.recall, 0.5);
        assert_relative_eq!(score.f1, 0.5);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = BioScorer
            .score(&tags(&["O"]), &tags(&["O", "O"]))
            .unwrap_err();
        assert!(matches!(err, Error::Shape(_)));
    }

    #[test]
    fn test_all_outside_prediction_scores_zero() {
        let y_true = tags(&["B-loc", "O"]);
        let y_pred = tags(&["O", "O"]);
        let score = BioScorer.score(&y_true, &y_pred).unwrap();
        assert_relative_eq!(score.precision, 0.0);
        assert_relative_eq!(score.recall, 0.0);
    }

    #[test]
    fn test_report_lists_labels_and_micro_avg() {
        let y_true = tags(&["B-loc", "O", "B-per"]);
        let y_pred = tags(&["B-loc", "O", "O"]);
        let report = BioScorer.report(&y_true, &y_pred).unwrap();
        assert!(report.contains("loc"));
        assert!(report.contains("per"));
        assert!(report.contains("micro avg"));
        assert!(report.contains("precision"));
    }
}
