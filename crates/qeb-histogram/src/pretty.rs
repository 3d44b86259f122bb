//! Plain-text rendering of histograms

use crate::types::HistogramWithErrorBars;

const DEFAULT_WIDTH: usize = 80;

/// Render a histogram as one text line per bin
///
/// Each line shows the bin center, a bar proportional to the bin value and
/// the value with its error bar. `max_width` bounds the line length; `0`
/// selects a default of 80 columns.
pub fn pretty_print(histogram: &HistogramWithErrorBars, max_width: usize) -> String {
    let max_width = if max_width == 0 { DEFAULT_WIDTH } else { max_width };

    let labels: Vec<String> = histogram
        .values_center()
        .iter()
        .map(|c| format!("{c:.4}"))
        .collect();
    let values: Vec<String> = histogram
        .bins()
        .iter()
        .zip(histogram.delta())
        .map(|(v, d)| format!("{v:.4e} +- {d:.2e}"))
        .collect();

    let label_width = labels.iter().map(String::len).max().unwrap_or(0);
    let value_width = values.iter().map(String::len).max().unwrap_or(0);
    let bar_width = max_width
        .saturating_sub(label_width + value_width + 5)
        .max(1);

    let peak = histogram.max_value();
    let mut out = String::new();
    for ((label, value), &v) in labels.iter().zip(&values).zip(histogram.bins()) {
        let len = if peak > 0.0 {
            ((v / peak) * bar_width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "{label:>label_width$} | {bar:<bar_width$} {value}\n",
            bar = "#".repeat(len.min(bar_width)),
        ));
    }
    if histogram.off_chart() > 0.0 {
        out.push_str(&format!("off chart: {:.4e}\n", histogram.off_chart()));
    }
    out
}

impl HistogramWithErrorBars {
    /// Text rendering of the histogram, see [`pretty_print`]
    pub fn pretty_print(&self, max_width: usize) -> String {
        pretty_print(self, max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HistogramParams;

    #[test]
    fn test_pretty_print_layout() {
        let params = HistogramParams::new(0.0, 1.0, 4).unwrap();
        let hist = HistogramWithErrorBars::from_parts(
            params,
            vec![1.0, 4.0, 2.0, 0.0],
            vec![0.1, 0.2, 0.1, 0.0],
            3.0,
        )
        .unwrap();

        let text = hist.pretty_print(60);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("0.1250 | "));
        assert!(lines[3].starts_with("0.8750 | "));
        assert!(lines[4].starts_with("off chart:"));

        // The tallest bin carries the longest bar
        let bar_len = |line: &str| line.matches('#').count();
        assert!(bar_len(lines[1]) > bar_len(lines[2]));
        assert!(bar_len(lines[2]) > bar_len(lines[0]));
        assert_eq!(bar_len(lines[3]), 0);
        assert!(lines.iter().take(4).all(|l| l.len() <= 60));
    }

    #[test]
    fn test_pretty_print_default_width() {
        let hist = HistogramWithErrorBars::new(0.0, 1.0, 2).unwrap();
        let text = hist.pretty_print(0);
        assert_eq!(text.lines().count(), 2);
    }
}
