use std::io::{self, BufWriter, Write};

use crate::lit::Lit;

/// Append-only proof sink. Every learnt clause and every deletion
/// (reduction, on-the-fly shrink, transitive reduction) is reported in
/// the order it happens.
///
/// `delete_delayed`/`finalize_delete` bracket an in-place shrink: the old
/// clause's deletion must appear *after* the strengthened clause has been
/// added, or the proof has a hole.
pub trait DratSink {
    fn enabled(&self) -> bool {
        true
    }
    fn add_clause(&mut self, lits: &[Lit]);
    fn delete_clause(&mut self, lits: &[Lit]);
    fn delete_delayed(&mut self, lits: &[Lit]);
    fn finalize_delete(&mut self);
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink used when no proof was requested.
#[derive(Debug, Default)]
pub struct NoDrat;

impl DratSink for NoDrat {
    fn enabled(&self) -> bool {
        false
    }
    fn add_clause(&mut self, _lits: &[Lit]) {}
    fn delete_clause(&mut self, _lits: &[Lit]) {}
    fn delete_delayed(&mut self, _lits: &[Lit]) {}
    fn finalize_delete(&mut self) {}
}

/// Textual DRAT writer.
pub struct DratWriter<W: Write> {
    out: BufWriter<W>,
    delayed: Option<Vec<Lit>>,
}

impl<W: Write> DratWriter<W> {
    pub fn new(w: W) -> Self {
        Self {
            out: BufWriter::new(w),
            delayed: None,
        }
    }

    fn write_record(&mut self, prefix: &str, lits: &[Lit]) {
        // Proof output failure is not recoverable mid-search; surface it loudly.
        let mut line = String::with_capacity(prefix.len() + lits.len() * 4 + 2);
        line.push_str(prefix);
        for lit in lits {
            line.push_str(&lit.to_external().to_string());
            line.push(' ');
        }
        line.push('0');
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .expect("failed to write DRAT record");
    }
}

impl<W: Write> DratSink for DratWriter<W> {
    fn add_clause(&mut self, lits: &[Lit]) {
        self.write_record("", lits);
    }

    fn delete_clause(&mut self, lits: &[Lit]) {
        self.write_record("d ", lits);
    }

    fn delete_delayed(&mut self, lits: &[Lit]) {
        debug_assert!(self.delayed.is_none(), "a delayed deletion is already pending");
        self.delayed = Some(lits.to_vec());
    }

    fn finalize_delete(&mut self) {
        if let Some(lits) = self.delayed.take() {
            self.write_record("d ", &lits);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(x: i32) -> Lit {
        Lit::from_external(x)
    }

    #[test]
    fn delayed_delete_order() {
        let mut buf = Vec::new();
        {
            let mut w = DratWriter::new(&mut buf);
            w.delete_delayed(&[lit(1), lit(2), lit(3)]);
            w.add_clause(&[lit(1), lit(2)]);
            w.finalize_delete();
            w.flush().unwrap();
        }
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "1 2 0\nd 1 2 3 0\n");
    }
}
