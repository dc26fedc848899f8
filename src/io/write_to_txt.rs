use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::{Array1, ArrayView1};

use crate::error::{Result, check_len};

/// Plain-text checkpoint file: one line per node with its coordinates, the
/// value and optionally the exact value; blocks separated by a blank line.
pub struct TextDump<W: Write> {
    writer: W,
    blocks: usize,
}

impl TextDump<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::from_writer(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> TextDump<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer, blocks: 0 }
    }
    pub fn blocks(&self) -> usize {
        self.blocks
    }
    pub fn write_block(
        &mut self,
        coords: &[Array1<f64>],
        values: ArrayView1<f64>,
        exact: Option<ArrayView1<f64>>,
    ) -> Result<()> {
        for c in coords.iter() {
            check_len("dump coordinates", values.len(), c.len())?;
        }
        if let Some(exact) = exact {
            check_len("dump exact values", values.len(), exact.len())?;
        }
        if self.blocks > 0 {
            writeln!(self.writer)?;
        }
        for (idx, value) in values.iter().enumerate() {
            for c in coords.iter() {
                write!(self.writer, "{:.10e} ", c[idx])?;
            }
            write!(self.writer, "{:.10e}", value)?;
            if let Some(exact) = exact {
                write!(self.writer, " {:.10e}", exact[idx])?;
            }
            writeln!(self.writer)?;
        }
        self.blocks += 1;
        Ok(())
    }
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_block_layout() {
        let mut dump = TextDump::from_writer(Vec::new());
        let x = array![0.0, 0.5];
        dump.write_block(&[x.clone()], array![1.0, 2.0].view(), None)
            .unwrap();
        dump.write_block(&[x], array![3.0, 4.0].view(), Some(array![3.5, 4.5].view()))
            .unwrap();
        assert_eq!(dump.blocks(), 2);
        let text = String::from_utf8(dump.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "");
        let fields: Vec<f64> = lines[4]
            .split_whitespace()
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(fields, vec![0.5, 4.0, 4.5]);
        assert_eq!(lines[0].split_whitespace().count(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let mut dump = TextDump::from_writer(Vec::new());
        let result = dump.write_block(&[array![0.0]], array![1.0, 2.0].view(), None);
        assert!(result.is_err());
        assert_eq!(dump.blocks(), 0);
    }

    #[test]
    fn test_create_makes_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dump.txt");
        let mut dump = TextDump::create(&path).unwrap();
        dump.write_block(&[array![1.0, 2.0], array![3.0, 4.0]], array![5.0, 6.0].view(), None)
            .unwrap();
        dump.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
