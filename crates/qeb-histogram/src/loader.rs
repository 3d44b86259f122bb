//! Reading and writing the tab-separated histogram file format
//!
//! The format is the one written by the command-line sampler: a header row
//! that is discarded, then one row per bin with the bin's left edge, its
//! value and its error bar. Additional columns are ignored. The left edges
//! are trusted to be linearly spaced; the histogram range is reconstructed
//! from the first two edges and the number of rows.

use crate::types::{HistogramParams, HistogramWithErrorBars};
use qeb_core::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Load a histogram file from disk
pub fn load_csv_histogram<P: AsRef<Path>>(path: P) -> Result<HistogramWithErrorBars> {
    let path = path.as_ref();
    debug!("Loading histogram from {}", path.display());
    let file = File::open(path)?;
    read_csv_histogram(file)
}

/// Read a histogram from any tab- or whitespace-separated source
pub fn read_csv_histogram<R: Read>(reader: R) -> Result<HistogramWithErrorBars> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut edges = Vec::new();
    let mut values = Vec::new();
    let mut errors = Vec::new();

    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| Error::Parse(e.to_string()))?;
        // Rows separated by spaces arrive as a single field
        let fields: Vec<&str> = if record.len() == 1 {
            record[0].split_whitespace().collect()
        } else {
            record.iter().filter(|f| !f.is_empty()).collect()
        };
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 3 {
            return Err(Error::InvalidInput(format!(
                "row {} has {} columns, expected at least 3",
                row + 2,
                fields.len()
            )));
        }

        edges.push(parse_cell(fields[0], row)?);
        values.push(parse_cell(fields[1], row)?);
        errors.push(parse_cell(fields[2], row)?);
    }

    if edges.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "histogram file needs at least 2 data rows to infer the bin width, got {}",
            edges.len()
        )));
    }

    let num_bins = edges.len();
    let resolution = edges[1] - edges[0];
    let params = HistogramParams::new(edges[0], edges[num_bins - 1] + resolution, num_bins)?;
    debug!("Histogram file describes {}", params);

    HistogramWithErrorBars::from_parts(params, values, errors, 0.0)
}

/// Write a histogram in the same tab-separated format
pub fn write_csv_histogram<W: Write>(histogram: &HistogramWithErrorBars, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    wtr.write_record(["Value", "Counts", "Error"])
        .map_err(|e| Error::Parse(e.to_string()))?;
    for ((edge, value), error) in histogram
        .values_lower()
        .iter()
        .zip(histogram.bins())
        .zip(histogram.delta())
    {
        wtr.write_record([edge.to_string(), value.to_string(), error.to_string()])
            .map_err(|e| Error::Parse(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a histogram file to disk
pub fn save_csv_histogram<P: AsRef<Path>>(
    histogram: &HistogramWithErrorBars,
    path: P,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv_histogram(histogram, file)
}

fn parse_cell(cell: &str, row: usize) -> Result<f64> {
    cell.parse::<f64>().map_err(|_| {
        Error::Parse(format!("row {}: '{}' is not a number", row + 2, cell))
    })
}
