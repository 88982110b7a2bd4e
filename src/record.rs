use crate::error::Result;
use crate::model::theoretical_fp_prob;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One evaluated `(m, n, k)` point with its empirical and modelled rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub empirical_fp: f64,
    pub theoretical_fp: f64,
    #[serde(rename = "theoretical_kstar")]
    pub theoretical_k_star: usize,
}

impl TrialRecord {
    /// Builds a record, filling in the modelled rate for `(m, n, k)`.
    pub fn new(
        m: usize,
        n: usize,
        k: usize,
        empirical_fp: f64,
        theoretical_k_star: usize,
    ) -> Self {
        Self {
            m,
            n,
            k,
            empirical_fp,
            theoretical_fp: theoretical_fp_prob(m, n, k),
            theoretical_k_star,
        }
    }
}

/// Receives trial records as they are produced.
pub trait RecordSink {
    fn record(&mut self, rec: &TrialRecord) -> Result<()>;

    /// Completes the output and surfaces any buffered write error.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<TrialRecord> {
    fn record(&mut self, rec: &TrialRecord) -> Result<()> {
        self.push(*rec);
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn record(&mut self, rec: &TrialRecord) -> Result<()> {
        (**self).record(rec)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn record(&mut self, _rec: &TrialRecord) -> Result<()> {
        Ok(())
    }
}

pub const CSV_HEADER: &str =
    "m,n,k,empirical_fp,theoretical_fp,theoretical_kstar";

/// Writes records as comma-separated rows, header first.
pub struct CsvSink<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.writer)
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{CSV_HEADER}")?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn record(&mut self, rec: &TrialRecord) -> Result<()> {
        self.write_header()?;
        writeln!(
            self.writer,
            "{},{},{},{},{},{}",
            rec.m,
            rec.n,
            rec.k,
            rec.empirical_fp,
            rec.theoretical_fp,
            rec.theoretical_k_star
        )?;
        Ok(())
    }

    // header even with no rows
    fn finish(&mut self) -> Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BloomError;
    use std::io::{self, BufWriter};

    /// Accepts writes, fails every flush.
    struct FullDevice;

    impl Write for FullDevice {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("no space left on device"))
        }
    }

    #[test]
    fn test_csv_rows() {
        let mut sink = CsvSink::new(Vec::new());
        sink.record(&TrialRecord::new(100, 0, 2, 0.0, 1)).unwrap();
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec![CSV_HEADER, "100,0,2,0,0,1"]);
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let sink = CsvSink::new(Vec::new());
        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out, format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_finish_writes_header_once() {
        let mut buf = Vec::new();
        {
            let mut sink = CsvSink::new(&mut buf);
            sink.finish().unwrap();
            sink.finish().unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out, format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_finish_through_trait_object() {
        let mut buf = Vec::new();
        {
            let mut boxed: Box<dyn RecordSink + '_> =
                Box::new(CsvSink::new(&mut buf));
            boxed.record(&TrialRecord::new(100, 0, 2, 0.0, 1)).unwrap();
            boxed.finish().unwrap();
        }
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_finish_reports_flush_failure() {
        let mut sink = CsvSink::new(BufWriter::new(FullDevice));
        sink.record(&TrialRecord::new(100, 0, 2, 0.0, 1)).unwrap();
        let result = sink.finish();
        assert!(matches!(result, Err(BloomError::Io(_))));
    }
}
