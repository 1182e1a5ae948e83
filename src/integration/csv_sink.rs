//! Per-frame coordinate log in CSV form.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::integration::SinkError;

/// One row of the tracking log: `frame,x,y,in_center`.
///
/// Frames without a coordinate have empty `x`/`y` and `in_center = false`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub frame: usize,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub in_center: bool,
}

impl TrackRecord {
    pub fn coordinate(&self) -> Option<Point2<f32>> {
        Some(Point2::new(self.x?, self.y?))
    }
}

/// Writes [`TrackRecord`]s with a header row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    /// Create (or truncate) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            rows: 0,
        })
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
            rows: 0,
        }
    }

    pub fn write(&mut self, record: &TrackRecord) -> Result<(), SinkError> {
        self.writer.serialize(record)?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

/// Load a log previously written by [`CsvSink`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<TrackRecord>, SinkError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_gaps() {
        let mut sink = CsvSink::from_writer(Vec::new());
        sink.write(&TrackRecord {
            frame: 0,
            x: Some(10.5),
            y: Some(20.0),
            in_center: true,
        })
        .unwrap();
        sink.write(&TrackRecord {
            frame: 1,
            x: None,
            y: None,
            in_center: false,
        })
        .unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["frame,x,y,in_center", "0,10.5,20.0,true", "1,,,false"]);
    }

    #[test]
    fn test_record_coordinate() {
        let record = TrackRecord {
            frame: 3,
            x: Some(1.0),
            y: None,
            in_center: false,
        };
        assert_eq!(record.coordinate(), None);
        let record = TrackRecord {
            y: Some(2.0),
            ..record
        };
        assert_eq!(record.coordinate(), Some(Point2::new(1.0, 2.0)));
    }

    #[test]
    fn test_read_back_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tracking_results.csv");
        let written = vec![
            TrackRecord {
                frame: 7,
                x: Some(3.25),
                y: Some(4.0),
                in_center: false,
            },
            TrackRecord {
                frame: 8,
                x: None,
                y: None,
                in_center: false,
            },
        ];

        let mut sink = CsvSink::create(&path).unwrap();
        for record in &written {
            sink.write(record).unwrap();
        }
        sink.flush().unwrap();
        drop(sink);

        let read = read_records(&path).unwrap();
        assert_eq!(read, written);
    }
}
