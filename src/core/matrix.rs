//! Integer basis matrix backed by `rug::Integer`
//!
//! Rows are lattice vectors. The matrix only supports the row operations a
//! reduction needs (swap, move, `row_i += x * row_j`) so that every state it
//! passes through spans the same lattice.

use crate::core::error::{LatticeError, Result};
use rug::Integer;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegerMatrix {
    data: Vec<Vec<Integer>>,
    cols: usize,
}

impl IntegerMatrix {
    /// Build from rows. An empty row list gives the 0 x 0 matrix.
    pub fn new(data: Vec<Vec<Integer>>) -> Result<Self> {
        let rows = data.len();
        let cols = data.first().map_or(0, |r| r.len());
        for r in &data {
            if r.len() != cols {
                return Err(LatticeError::invalid_dimensions((rows, cols), (rows, r.len())));
            }
        }
        Ok(IntegerMatrix { data, cols })
    }

    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Result<Self> {
        Self::new(
            rows.iter()
                .map(|r| r.iter().map(|&v| Integer::from(v)).collect())
                .collect(),
        )
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        IntegerMatrix { data: vec![vec![Integer::new(); cols]; rows], cols }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i][i] = Integer::from(1);
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Integer> {
        self.data.get(row)?.get(col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: Integer) -> Result<()> {
        if row >= self.rows() || col >= self.cols {
            return Err(LatticeError::invalid_dimensions((self.rows(), self.cols), (row, col)));
        }
        self.data[row][col] = value;
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<&[Integer]> {
        self.data
            .get(row)
            .map(|r| r.as_slice())
            .ok_or_else(|| LatticeError::out_of_range(row, self.rows()))
    }

    pub fn to_rows(&self) -> Vec<Vec<Integer>> {
        self.data.clone()
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows() {
            return Err(LatticeError::out_of_range(row, self.rows()));
        }
        Ok(())
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_row(i)?;
        self.check_row(j)?;
        self.data.swap(i, j);
        Ok(())
    }

    /// Remove row `old` and reinsert it at index `new`, shifting the rows in between.
    pub fn move_row(&mut self, old: usize, new: usize) -> Result<()> {
        self.check_row(old)?;
        self.check_row(new)?;
        let row = self.data.remove(old);
        self.data.insert(new, row);
        Ok(())
    }

    /// `row_i += x * row_j`
    pub fn row_addmul(&mut self, i: usize, j: usize, x: &Integer) -> Result<()> {
        self.check_row(i)?;
        self.check_row(j)?;
        if i == j {
            return Err(LatticeError::invalid_parameters(format!(
                "row_addmul needs two distinct rows, got {} twice",
                i
            )));
        }
        let (target, source) = if i < j {
            let (lo, hi) = self.data.split_at_mut(j);
            (&mut lo[i], &hi[0])
        } else {
            let (lo, hi) = self.data.split_at_mut(i);
            (&mut hi[0], &lo[j])
        };
        for (t, s) in target.iter_mut().zip(source.iter()) {
            *t += Integer::from(x * s);
        }
        Ok(())
    }

    /// Append an all-zero row.
    pub fn push_zero_row(&mut self) {
        self.data.push(vec![Integer::new(); self.cols]);
    }

    pub fn pop_row(&mut self) -> Option<Vec<Integer>> {
        self.data.pop()
    }

    /// Exact inner product of two rows
    pub fn row_dot(&self, i: usize, j: usize) -> Result<Integer> {
        self.check_row(i)?;
        self.check_row(j)?;
        let mut acc = Integer::new();
        for (a, b) in self.data[i].iter().zip(self.data[j].iter()) {
            acc += Integer::from(a * b);
        }
        Ok(acc)
    }

    /// Exact squared Euclidean norm of a row
    pub fn sq_norm(&self, row: usize) -> Result<Integer> {
        self.row_dot(row, row)
    }

    pub fn is_row_zero(&self, row: usize) -> Result<bool> {
        Ok(self.row(row)?.iter().all(|v| *v == 0))
    }

    /// Bit length of the largest entry in absolute value.
    pub fn max_bits(&self) -> u32 {
        self.data
            .iter()
            .flat_map(|r| r.iter())
            .map(|v| v.significant_bits())
            .max()
            .unwrap_or(0)
    }

    /// fplll text form: `[[a b]\n[c d]\n]`
    pub fn to_fplll_format(&self) -> String {
        let mut output = String::from("[");
        for row in &self.data {
            output.push('[');
            output.push_str(&row.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(" "));
            output.push_str("]\n");
        }
        output.push_str("]\n");
        output
    }

    /// Rows as JSON arrays. Entries that fit an `i64` are numbers, larger ones strings.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.data
                .iter()
                .map(|row| {
                    serde_json::Value::Array(
                        row.iter()
                            .map(|v| match v.to_i64() {
                                Some(small) => serde_json::Value::from(small),
                                None => serde_json::Value::String(v.to_string()),
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Inverse of [`to_json`](Self::to_json): an array of rows whose entries are
    /// integer numbers or decimal strings.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let rows = value.as_array().ok_or_else(|| {
            LatticeError::parse_error("Invalid JSON matrix: expected an array of rows")
        })?;
        let mut data = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let entries = row.as_array().ok_or_else(|| {
                LatticeError::parse_error(format!("Invalid JSON matrix: row {} is not an array", i + 1))
            })?;
            if entries.is_empty() {
                return Err(LatticeError::parse_error(format!("Row {} has 0 entries", i + 1)));
            }
            let mut parsed = Vec::with_capacity(entries.len());
            for entry in entries {
                let text = match entry {
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::String(s) => s.clone(),
                    other => {
                        return Err(LatticeError::parse_error(format!(
                            "Unsupported JSON matrix element in row {}: {}",
                            i + 1,
                            other
                        )))
                    }
                };
                let value = Integer::from_str_radix(&text, 10).map_err(|e| {
                    LatticeError::parse_error(format!(
                        "Failed to parse integer at row {}: '{}': {}",
                        i + 1,
                        text,
                        e
                    ))
                })?;
                parsed.push(value);
            }
            data.push(parsed);
        }
        Self::new(data).map_err(|e| LatticeError::parse_error(e.to_string()))
    }

    /// Parse a matrix.
    ///
    /// Supported formats:
    ///  1. fplll brackets: `[[1 2][3 4]]`
    ///  2. JSON rows: `[[1, 2], [3, "4"]]`
    ///  3. Plain text with optional header: "rows cols" on the first line,
    ///     followed by rows of integers separated by spaces/commas/semicolons.
    pub fn from_fplll_format(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('[') {
            return Self::parse_plain(trimmed);
        }
        // commas, quotes and objects never occur in fplll output
        if trimmed.contains(|c: char| matches!(c, ',' | '"' | '{' | ':')) {
            let value: serde_json::Value = serde_json::from_str(trimmed)?;
            Self::from_json(&value)
        } else {
            Self::parse_bracketed(trimmed)
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LatticeError::io_error(format!("Failed to read matrix file {}: {}", path.display(), e))
        })?;
        Self::from_fplll_format(&content)
    }

    fn parse_bracketed(input: &str) -> Result<Self> {
        let mut rows = Vec::new();
        let mut depth = 0usize;
        let mut closed = false;
        let mut current = String::new();
        for c in input.chars() {
            if closed && !c.is_whitespace() {
                return Err(LatticeError::parse_error(format!(
                    "Unexpected '{}' after the end of the matrix",
                    c
                )));
            }
            match c {
                '[' => {
                    depth += 1;
                    if depth > 2 {
                        return Err(LatticeError::parse_error("Matrix nesting deeper than two levels"));
                    }
                    current.clear();
                }
                ']' => {
                    if depth == 0 {
                        return Err(LatticeError::parse_error("Unbalanced ']' in matrix"));
                    }
                    if depth == 2 {
                        rows.push(Self::parse_row(&current, rows.len() + 1)?);
                    }
                    depth -= 1;
                    closed = depth == 0;
                }
                _ if depth == 2 => current.push(c),
                _ if c.is_whitespace() => {}
                _ => {
                    return Err(LatticeError::parse_error(format!(
                        "Unexpected '{}' between matrix rows",
                        c
                    )))
                }
            }
        }
        if depth != 0 {
            return Err(LatticeError::parse_error("Unterminated '[' in matrix"));
        }
        Self::new(rows).map_err(|e| LatticeError::parse_error(e.to_string()))
    }

    fn parse_plain(input: &str) -> Result<Self> {
        let mut lines = input
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .enumerate();

        let mut rows = Vec::new();
        let mut header = None;
        if let Some((line_no, first)) = lines.next() {
            let tokens: Vec<&str> = first.split_whitespace().collect();
            match (tokens.len(), tokens.first().and_then(|t| t.parse::<usize>().ok()), tokens.get(1).and_then(|t| t.parse::<usize>().ok())) {
                (2, Some(r), Some(c)) => header = Some((r, c)),
                _ => rows.push(Self::parse_row(first, line_no + 1)?),
            }
        }
        for (line_no, line) in lines {
            rows.push(Self::parse_row(line, line_no + 1)?);
        }

        if let Some((r, c)) = header {
            if rows.len() != r || rows.iter().any(|row| row.len() != c) {
                let found_cols = rows.iter().map(|row| row.len()).find(|&len| len != c).unwrap_or(c);
                return Err(LatticeError::parse_error(format!(
                    "Header specifies {} x {}, but the file contains {} rows of {} entries",
                    r,
                    c,
                    rows.len(),
                    found_cols
                )));
            }
            if r == 0 {
                return Ok(Self::zeros(0, c));
            }
        }
        Self::new(rows).map_err(|e| LatticeError::parse_error(e.to_string()))
    }

    fn parse_row(line: &str, line_no: usize) -> Result<Vec<Integer>> {
        let mut row = Vec::new();
        for tok in line
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|t| !t.is_empty())
        {
            let value = Integer::from_str_radix(tok, 10).map_err(|e| {
                LatticeError::parse_error(format!(
                    "Failed to parse integer at row {}: '{}': {}",
                    line_no, tok, e
                ))
            })?;
            row.push(value);
        }
        if row.is_empty() {
            return Err(LatticeError::parse_error(format!("Row {} has 0 entries", line_no)));
        }
        Ok(row)
    }
}

impl fmt::Display for IntegerMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fplll_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[Vec<i64>]) -> IntegerMatrix {
        IntegerMatrix::from_i64_rows(rows).unwrap()
    }

    #[test]
    fn test_row_operations() {
        let mut a = m(&[vec![1, 2], vec![3, 4], vec![5, 6]]);
        a.row_addmul(2, 0, &Integer::from(-5)).unwrap();
        assert_eq!(a.row(2).unwrap(), &[Integer::from(0), Integer::from(-4)][..]);
        a.row_addmul(0, 2, &Integer::from(1)).unwrap();
        assert_eq!(a.row(0).unwrap(), &[Integer::from(1), Integer::from(-2)][..]);
        a.move_row(0, 2).unwrap();
        assert_eq!(a.row(2).unwrap()[1], -2);
        assert_eq!(a.row(0).unwrap()[0], 3);
        assert!(a.row_addmul(1, 1, &Integer::from(2)).is_err());
        assert!(matches!(a.swap_rows(0, 3), Err(LatticeError::OutOfRange { index: 3, bound: 3 })));
    }

    #[test]
    fn test_norms_and_bits() {
        let a = m(&[vec![3, -4], vec![0, 0]]);
        assert_eq!(a.sq_norm(0).unwrap(), 25);
        assert_eq!(a.row_dot(0, 1).unwrap(), 0);
        assert!(a.is_row_zero(1).unwrap());
        assert_eq!(a.max_bits(), 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![Integer::from(1)], vec![Integer::from(1), Integer::from(2)]];
        assert!(IntegerMatrix::new(rows).is_err());
        assert_eq!(IntegerMatrix::new(Vec::new()).unwrap().rows(), 0);
    }

    #[test]
    fn test_fplll_format() {
        let a = m(&[vec![1, 0, -3], vec![7, 8, 9]]);
        let text = a.to_fplll_format();
        assert_eq!(text, "[[1 0 -3]\n[7 8 9]\n]\n");
        assert_eq!(IntegerMatrix::from_fplll_format(&text).unwrap(), a);
    }

    #[test]
    fn test_json_and_plain_inputs() {
        let big = "[[1, \"340282366920938463463374607431768211456\"], [2, 3]]";
        let a = IntegerMatrix::from_fplll_format(big).unwrap();
        assert_eq!(a.max_bits(), 129);
        assert_eq!(a.to_json()[1][0], serde_json::json!(2));

        let plain = "# a comment\n2 2\n1 2\n3 4\n";
        assert_eq!(IntegerMatrix::from_fplll_format(plain).unwrap(), m(&[vec![1, 2], vec![3, 4]]));
        assert!(IntegerMatrix::from_fplll_format("2 2\n1 2\n").is_err());
        assert!(IntegerMatrix::from_fplll_format("[[1 2]").is_err());
        assert!(IntegerMatrix::from_fplll_format("[[1 x]]").is_err());
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let parse = |s: &str| IntegerMatrix::from_fplll_format(s);
        assert!(matches!(parse(r#"[["1 2"], ["3 4"]]"#), Err(LatticeError::Parse(_))));
        assert!(matches!(parse(r#"[[1, 2], {"x": 3}]"#), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1, 2], [3, 4]] trailing garbage"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1, 2.5]]"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1, null]]"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1, 2], []]"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1, 2], [3]]"), Err(LatticeError::Parse(_))));

        assert!(matches!(parse("[[1 2][3 4]] garbage"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[[1 2]] [[3 4]]"), Err(LatticeError::Parse(_))));
        assert!(matches!(parse("[x[1 2][3 4]]"), Err(LatticeError::Parse(_))));

        let a = m(&[vec![-1, 0], vec![5, 6]]);
        assert_eq!(IntegerMatrix::from_json(&a.to_json()).unwrap(), a);
        assert_eq!(parse("[[-1, 0], [5, \"6\"]]").unwrap(), a);
        assert!(IntegerMatrix::from_json(&serde_json::json!({"rows": 2})).is_err());
    }
}
