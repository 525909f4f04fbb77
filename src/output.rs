//! Sinks for logged simulation rows.
//!
//! A row is a time stamp followed by the values of one solver vector.

use std::io::Write;

use crate::error::Result;

/// Destination for logged rows.
pub trait DataSink {
    fn append_row(&mut self, time: f64, values: &[f64]) -> Result<()>;
}

/// Keeps rows in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBuffer {
    rows: Vec<(f64, Vec<f64>)>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[(f64, Vec<f64>)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One column across all rows.
    pub fn column(&self, index: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rows
            .iter()
            .filter_map(move |(t, values)| values.get(index).map(|v| (*t, *v)))
    }
}

impl DataSink for RowBuffer {
    fn append_row(&mut self, time: f64, values: &[f64]) -> Result<()> {
        self.rows.push((time, values.to_vec()));
        Ok(())
    }
}

/// Writes comma-separated rows to any writer.
///
/// The header is written with the first row, once the column count is known.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    prefix: String,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    /// Columns are named `time, {prefix}0, {prefix}1, ...`.
    pub fn new(writer: W, prefix: impl Into<String>) -> Self {
        Self {
            writer,
            prefix: prefix.into(),
            header_written: false,
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataSink for CsvSink<W> {
    fn append_row(&mut self, time: f64, values: &[f64]) -> Result<()> {
        if !self.header_written {
            write!(self.writer, "time")?;
            for index in 0..values.len() {
                write!(self.writer, ",{}{}", self.prefix, index)?;
            }
            writeln!(self.writer)?;
            self.header_written = true;
        }
        write!(self.writer, "{time:e}")?;
        for value in values {
            write!(self.writer, ",{value:e}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_buffer_column() {
        let mut buffer = RowBuffer::new();
        buffer.append_row(0.1, &[1.0, 2.0]).unwrap();
        buffer.append_row(0.2, &[3.0, 4.0]).unwrap();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.column(1).collect::<Vec<_>>(), vec![(0.1, 2.0), (0.2, 4.0)]);
    }

    #[test]
    fn test_csv_layout() {
        let mut sink = CsvSink::new(Vec::new(), "v");
        sink.append_row(0.5, &[1.0, -2.0]).unwrap();
        sink.append_row(1.0, &[0.25, 0.0]).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["time,v0,v1", "5e-1,1e0,-2e0", "1e0,2.5e-1,0e0"]);
    }
}
