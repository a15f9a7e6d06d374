use super::crossval::ResultsMatrix;
use super::smoothing::Smoothed;
use super::sweep::SweepSeries;
use crate::utils::Result;
use csv::Writer;
use std::fs::File;

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "nan".to_string(),
    }
}

fn open_csv(path: &str) -> Result<Writer<File>> {
    Writer::from_path(path).map_err(|e| format!("{}: {}", path, e))
}

pub struct SweepWriter {
    writer: Writer<File>,
    path: String,
}

impl SweepWriter {
    pub fn new(path: &str) -> Result<Self> {
        Ok(SweepWriter {
            writer: open_csv(path)?,
            path: path.to_string(),
        })
    }

    /// One row per cutoff: raw series, event counts, then smoothed mean/std of
    /// the single-read and multi-read best-chunk series.
    pub fn write(
        &mut self,
        series: &SweepSeries,
        single: &Smoothed,
        multi_best: &Smoothed,
    ) -> Result<()> {
        let err = |e: csv::Error| format!("{}: {}", self.path, e);
        self.writer
            .write_record([
                "cutoff",
                "single",
                "multi_independent",
                "multi_best",
                "num_single",
                "num_multi",
                "single_smoothed",
                "single_std",
                "multi_best_smoothed",
                "multi_best_std",
            ])
            .map_err(err)?;

        for (i, point) in series.points.iter().enumerate() {
            let record = [
                format!("{:.3}", point.cutoff),
                format_value(point.single),
                format_value(point.multi_independent),
                format_value(point.multi_best),
                point.num_single.to_string(),
                point.num_multi.to_string(),
                format_value(single.mean.get(i).copied().flatten()),
                format_value(single.std.get(i).copied().flatten()),
                format_value(multi_best.mean.get(i).copied().flatten()),
                format_value(multi_best.std.get(i).copied().flatten()),
            ];
            self.writer.write_record(&record).map_err(err)?;
        }
        self.writer.flush().map_err(|e| format!("{}: {}", self.path, e))
    }
}

/// File suffix for a results matrix, e.g. `46_cscore_9.csv` for 46 events at 0.9.
pub fn results_suffix(matrix: &ResultsMatrix) -> String {
    let cutoff = matrix.cutoff.to_string();
    let digits = cutoff.split_once('.').map_or(cutoff.as_str(), |(_, frac)| frac);
    format!("{}_cscore_{}.csv", matrix.sample_size(), digits)
}

/// One row per fold, hard then soft score for each method in
/// [`ResultsMatrix::header`] order. Plain numeric matrix, no header row.
pub fn write_results_matrix(path: &str, matrix: &ResultsMatrix) -> Result<()> {
    let mut writer = open_csv(path)?;
    let err = |e: csv::Error| format!("{}: {}", path, e);

    for values in matrix.values() {
        let record = values.into_iter().map(format_value).collect::<Vec<_>>();
        writer.write_record(&record).map_err(err)?;
    }
    writer.flush().map_err(|e| format!("{}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{FoldResult, MethodScore, SweepPoint};

    fn matrix(cutoff: f64, qualifying: &[usize]) -> ResultsMatrix {
        ResultsMatrix {
            cutoff,
            rows: qualifying
                .iter()
                .enumerate()
                .map(|(fold, &q)| FoldResult {
                    fold,
                    qualifying: q,
                    scores: vec![
                        MethodScore {
                            hard: (q > 0).then_some(0.5),
                            soft: (q > 0).then_some(0.25),
                        };
                        6
                    ],
                })
                .collect(),
        }
    }

    #[test]
    fn test_results_suffix() {
        assert_eq!(results_suffix(&matrix(0.9, &[46, 46])), "46_cscore_9.csv");
        assert_eq!(results_suffix(&matrix(0.1, &[3, 4])), "3_cscore_1.csv");
        assert_eq!(results_suffix(&matrix(0.25, &[0])), "0_cscore_25.csv");
    }

    #[test]
    fn test_write_results_matrix_marks_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let path = path.to_str().unwrap();
        write_results_matrix(path, &matrix(0.5, &[2, 0])).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0.500000,0.250000,0.500000"));
        assert_eq!(lines[1].split(',').filter(|v| *v == "nan").count(), 12);
    }

    #[test]
    fn test_write_results_matrix_is_folds_by_methods() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let path = path.to_str().unwrap();
        write_results_matrix(path, &matrix(0.9, &[46, 46, 46, 45, 47])).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let rows = text.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 5);
        for row in rows {
            let fields = row.split(',').collect::<Vec<_>>();
            assert_eq!(fields.len(), 12);
            assert!(fields.iter().all(|v| v.parse::<f64>().is_ok()));
        }
    }

    #[test]
    fn test_write_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let path = path.to_str().unwrap();
        let series = SweepSeries {
            points: vec![SweepPoint {
                cutoff: 0.999,
                single: Some(1.0),
                multi_independent: None,
                multi_best: None,
                num_single: 1,
                num_multi: 0,
            }],
        };
        let smoothed = Smoothed {
            mean: vec![Some(1.0)],
            std: vec![Some(0.0)],
        };
        let empty = Smoothed {
            mean: vec![None],
            std: vec![None],
        };
        let mut writer = SweepWriter::new(path).unwrap();
        writer.write(&series, &smoothed, &empty).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[1],
            "0.999,1.000000,nan,nan,1,0,1.000000,0.000000,nan,nan"
        );
    }
}
