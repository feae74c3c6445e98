use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::trace;

use crate::lit::Lit;

pub fn get_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(OsStr::to_str)
}

pub fn read_maybe_gzip<P>(path: P) -> io::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let capacity = 128 * 1024;
    Ok(if get_extension(path) == Some("gz") {
        Box::new(BufReader::with_capacity(capacity, GzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(capacity, file))
    })
}

pub fn parse_dimacs<P>(path: P) -> io::Result<impl Iterator<Item = Vec<Lit>>>
where
    P: AsRef<Path>,
{
    let reader = read_maybe_gzip(path)?;
    Ok(reader.lines().map_while(Result::ok).filter_map(|line| {
        if line.is_empty() || line.starts_with('c') || line.starts_with('p') {
            trace!("Skipping '{}'", line);
            None
        } else {
            Some(parse_dimacs_clause(&line))
        }
    }))
}

/// One DIMACS clause line: integer literals up to the terminating zero.
pub fn parse_dimacs_clause(line: &str) -> Vec<Lit> {
    let mut lits = Vec::new();
    for tok in line.split_ascii_whitespace() {
        let x: i32 = tok.parse().expect("could not parse lit in clause");
        if x == 0 {
            return lits;
        }
        lits.push(Lit::from_external(x));
    }
    panic!("clause line '{line}' has no terminating zero");
}

/// Term `x` (0-based) of the reluctant-doubling sequence
/// 1, 1, 2, 1, 1, 2, 4, ..., as a power of `y`.
pub fn luby(y: f64, x: u32) -> f64 {
    // Block k of the sequence ends at index 2^k - 1 (1-based) with the
    // value y^(k-1); every earlier position replays the sequence from
    // the start.
    let mut i = x + 1;
    loop {
        let k = 31 - (i + 1).leading_zeros();
        let block_end = (1u32 << k) - 1;
        if i == block_end {
            return y.powi(k as i32 - 1);
        }
        i -= block_end;
    }
}

pub struct DisplaySlice<'a, T>(pub &'a [T]);

impl<T: Display> Display for DisplaySlice<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_prefix() {
        let seq: Vec<u32> = (0..15).map(|i| luby(2.0, i) as u32).collect();
        assert_eq!(seq, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[test]
    fn dimacs_clause() {
        let lits = parse_dimacs_clause("1 -2 3 0");
        assert_eq!(lits, vec![Lit::from_external(1), Lit::from_external(-2), Lit::from_external(3)]);
    }

    #[test]
    fn display_slice() {
        let lits = [Lit::from_external(1), Lit::from_external(-2)];
        assert_eq!(DisplaySlice(&lits).to_string(), "[1, -2]");
    }
}
