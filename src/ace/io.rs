//! ASCII ACE file framing.
//!
//! A file holds one or more tables. Each table is three header lines (ids,
//! comment, material), two lines of NXS integers, four lines of JXS
//! pointers, then the XSS payload four values per line. Numbers are written
//! with Rust's shortest round-trip formatting, so a read-write-read cycle
//! reproduces every value exactly.

use crate::ace::data::{AceHeader, JXS_LEN, NXS_LEN};
use crate::ace::table::AceTable;
use crate::error::{HeliosError, Result};
use itertools::Itertools;
use std::fmt::Write as _;
use std::path::Path;

const INTS_PER_LINE: usize = 8;
const VALUES_PER_LINE: usize = 4;

/// Parse every table in an ASCII ACE document.
pub fn read_ace(text: &str) -> Result<Vec<AceTable>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tables = Vec::new();
    let mut line = 0;
    while line < lines.len() {
        // Skip blank separator lines between tables
        if lines[line].trim().is_empty() {
            line += 1;
            continue;
        }
        let (table, consumed) = read_table(&lines[line..], line)?;
        tables.push(table);
        line += consumed;
    }
    if tables.is_empty() {
        return Err(HeliosError::ParseError {
            path: "ace".to_string(),
            reason: "document holds no tables".to_string(),
        });
    }
    Ok(tables)
}

/// Read every table from an ASCII ACE file.
pub fn read_ace_file(path: &Path) -> Result<Vec<AceTable>> {
    let text = std::fs::read_to_string(path)?;
    read_ace(&text).map_err(|e| match e {
        HeliosError::ParseError { reason, .. } => HeliosError::ParseError {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// Render tables to an ASCII ACE document.
pub fn write_ace(tables: &[AceTable]) -> String {
    let mut out = String::new();
    for table in tables {
        let (nxs, jxs, xss) = table.dump();
        let header = &table.header;
        writeln!(
            out,
            "{} {} {} {}",
            header.zaid, header.atomic_weight_ratio, header.temperature, header.date
        )
        .expect("writing to a String cannot fail");
        out.push_str(&header.comment);
        out.push('\n');
        out.push_str(&header.material);
        out.push('\n');
        write_int_lines(&mut out, &nxs);
        write_int_lines(&mut out, &jxs);
        for chunk in &xss.iter().chunks(VALUES_PER_LINE) {
            let rendered = chunk.map(|value| format!("{value:>24}")).join(" ");
            out.push_str(&rendered);
            out.push('\n');
        }
    }
    out
}

/// Write tables to an ASCII ACE file.
pub fn write_ace_file(path: &Path, tables: &[AceTable]) -> Result<()> {
    std::fs::write(path, write_ace(tables))?;
    Ok(())
}

fn write_int_lines(out: &mut String, values: &[i64]) {
    for chunk in &values.iter().chunks(INTS_PER_LINE) {
        let rendered = chunk.map(|value| format!("{value:>10}")).join(" ");
        out.push_str(&rendered);
        out.push('\n');
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> HeliosError {
    HeliosError::ParseError {
        path: "ace".to_string(),
        reason: format!("line {}: {}", line + 1, reason.into()),
    }
}

/// Parse one table starting at `lines[0]`; returns it and the line count
/// consumed. `base` is the absolute line number for error reporting.
fn read_table(lines: &[&str], base: usize) -> Result<(AceTable, usize)> {
    if lines.len() < 3 {
        return Err(parse_error(base, "truncated table header"));
    }
    let mut ids = lines[0].split_whitespace();
    let zaid = ids
        .next()
        .ok_or_else(|| parse_error(base, "missing zaid"))?
        .to_string();
    let atomic_weight_ratio = parse_float(ids.next(), base, "atomic weight ratio")?;
    let temperature = parse_float(ids.next(), base, "temperature")?;
    let date = ids.next().unwrap_or("").to_string();
    let comment = lines[1].trim_end().to_string();
    let material = lines[2].trim_end().to_string();

    let mut line = 3;
    let nxs_values = read_int_block::<NXS_LEN>(lines, &mut line, base, "NXS")?;
    let jxs_values = read_int_block::<JXS_LEN>(lines, &mut line, base, "JXS")?;

    let payload_len = usize::try_from(nxs_values[0])
        .map_err(|_| parse_error(base + line, format!("bad XSS length {}", nxs_values[0])))?;
    let mut xss = Vec::with_capacity(payload_len);
    while xss.len() < payload_len {
        let Some(text) = lines.get(line) else {
            return Err(parse_error(
                base + line,
                format!("XSS truncated at {} of {payload_len} words", xss.len()),
            ));
        };
        for token in text.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| parse_error(base + line, format!("bad XSS value '{token}'")))?;
            xss.push(value);
        }
        line += 1;
    }
    if xss.len() > payload_len {
        return Err(parse_error(
            base + line - 1,
            format!("XSS holds {} words, expected {payload_len}", xss.len()),
        ));
    }

    let header = AceHeader {
        zaid,
        atomic_weight_ratio,
        temperature,
        date,
        comment,
        material,
    };
    let table = AceTable::from_raw(header, nxs_values, jxs_values, &xss)?;
    Ok((table, line))
}

fn parse_float(token: Option<&str>, line: usize, what: &str) -> Result<f64> {
    let token = token.ok_or_else(|| parse_error(line, format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| parse_error(line, format!("bad {what} '{token}'")))
}

fn read_int_block<const N: usize>(
    lines: &[&str],
    line: &mut usize,
    base: usize,
    what: &str,
) -> Result<[i64; N]> {
    let mut values = [0_i64; N];
    let mut filled = 0;
    while filled < N {
        let Some(text) = lines.get(*line) else {
            return Err(parse_error(
                base + *line,
                format!("{what} truncated at {filled} of {N} integers"),
            ));
        };
        for token in text.split_whitespace() {
            if filled == N {
                return Err(parse_error(
                    base + *line,
                    format!("{what} holds more than {N} integers"),
                ));
            }
            values[filled] = token
                .parse()
                .map_err(|_| parse_error(base + *line, format!("bad {what} value '{token}'")))?;
            filled += 1;
        }
        *line += 1;
    }
    Ok(values)
}
