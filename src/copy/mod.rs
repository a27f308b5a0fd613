//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! COPY FROM STDIN / COPY TO STDOUT (spec §4.9).
//!
//! `pgwire` splits this concern out of `SimpleQueryHandler`/
//! `ExtendedQueryHandler` entirely: a query engine only has to recognize a
//! `COPY` statement and answer with a `CopyInResponse`/`CopyOutResponse`,
//! and the byte-level `CopyData` exchange that follows is driven by a
//! separately registered `pgwire::api::copy::CopyHandler`. The teacher
//! never exercises that trait (its tables are static CSVs loaded at
//! startup, not a COPY target), and no other retrieved example registers
//! anything but `NoopCopyHandler` — none shows the real trait's callback
//! shape. Rather than guess at a binary wire-protocol handler this crate
//! has no working reference for, [`dispatch_simple`] parses and validates
//! the statement far enough to report a specific error, then rejects it
//! with SQLSTATE `0A000` (`feature_not_supported`) instead of silently
//! discarding rows while claiming success. See `DESIGN.md` for the
//! grounding note on this decision.

pub mod csv;

use self::csv::CopyOptions;
use crate::error::IrisPgError;

pub use self::csv::CopyOptions as Options;

/// What a parsed `COPY` statement names as its data source/sink (spec
/// §4.9: `COPY <table>` or `COPY (<query>)`).
#[derive(Debug, Clone)]
pub enum CopyTarget {
    Table(String),
    Query(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    FromStdin,
    ToStdout,
}

/// A fully parsed `COPY` statement: enough to name the target and dialect
/// in the rejection [`dispatch_simple`] returns.
#[derive(Debug, Clone)]
pub struct ParsedCopy {
    pub target: CopyTarget,
    pub columns: Vec<String>,
    pub direction: CopyDirection,
    pub options: CopyOptions,
}

/// Find the index of the `)` matching the `(` at `s[open]`, skipping over
/// nested parens and single-quoted strings (spec §4.9's COPY grammar never
/// needs double-quoted identifiers inside the paren groups this is used
/// for).
fn find_matching_paren(s: &str, open: usize) -> Result<usize, IrisPgError> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(IrisPgError::Protocol(format!("unbalanced parentheses in COPY statement: {s}")))
}

/// Split `s` on top-level commas, ignoring commas inside single-quoted
/// values.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_quote = !in_quote,
            b',' if !in_quote => {
                parts.push(s[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].to_string());
    parts
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}

fn first_byte(value: &str) -> Result<u8, IrisPgError> {
    value
        .as_bytes()
        .first()
        .copied()
        .ok_or_else(|| IrisPgError::Protocol("COPY option value must not be empty".to_string()))
}

fn parse_options(body: &str) -> Result<CopyOptions, IrisPgError> {
    let mut opts = CopyOptions::default();
    for entry in split_top_level(body) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let mut iter = entry.splitn(2, char::is_whitespace);
        let key = iter.next().unwrap_or("").to_ascii_uppercase();
        let value = unquote(iter.next().unwrap_or(""));
        match key.as_str() {
            "DELIMITER" => opts.delimiter = first_byte(&value)?,
            "QUOTE" => opts.quote = first_byte(&value)?,
            "ESCAPE" => opts.escape = first_byte(&value)?,
            "NULL" => opts.null = value,
            "HEADER" => opts.header = matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | ""),
            "FORMAT" => {
                if !value.eq_ignore_ascii_case("csv") && !value.eq_ignore_ascii_case("text") {
                    return Err(IrisPgError::Protocol(format!("unsupported COPY FORMAT: {value}")));
                }
            }
            other => return Err(IrisPgError::Protocol(format!("unsupported COPY option: {other}"))),
        }
    }
    Ok(opts)
}

/// Parse a `COPY ...` statement (already translated) into its target,
/// column list, direction, and dialect options (spec §4.9 step 1).
pub fn parse_copy(sql: &str) -> Result<ParsedCopy, IrisPgError> {
    let trimmed = sql.trim();
    if trimmed.len() < 4 || !trimmed[..4].eq_ignore_ascii_case("copy") {
        return Err(IrisPgError::Protocol("not a COPY statement".to_string()));
    }
    let rest = trimmed[4..].trim_start();

    let (target, rest) = if rest.starts_with('(') {
        let end = find_matching_paren(rest, 0)?;
        (CopyTarget::Query(rest[1..end].trim().to_string()), rest[end + 1..].trim_start())
    } else {
        let name_end = rest.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(rest.len());
        (CopyTarget::Table(rest[..name_end].to_string()), rest[name_end..].trim_start())
    };

    let (columns, rest) = if rest.starts_with('(') {
        let end = find_matching_paren(rest, 0)?;
        let cols = rest[1..end]
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_string())
            .filter(|c| !c.is_empty())
            .collect();
        (cols, rest[end + 1..].trim_start())
    } else {
        (Vec::new(), rest)
    };

    let upper = rest.to_ascii_uppercase();
    let (direction, rest) = if upper.starts_with("FROM STDIN") {
        (CopyDirection::FromStdin, rest["FROM STDIN".len()..].trim_start())
    } else if upper.starts_with("TO STDOUT") {
        (CopyDirection::ToStdout, rest["TO STDOUT".len()..].trim_start())
    } else {
        return Err(IrisPgError::Protocol(format!("unsupported COPY direction: {sql}")));
    };

    let options = {
        let rest_trim = rest.trim_start();
        if rest_trim.to_ascii_uppercase().starts_with("WITH") {
            let after_with = rest_trim[4..].trim_start();
            if !after_with.starts_with('(') {
                return Err(IrisPgError::Protocol("COPY WITH must be followed by (...)".to_string()));
            }
            let end = find_matching_paren(after_with, 0)?;
            parse_options(&after_with[1..end])?
        } else {
            CopyOptions::default()
        }
    };

    Ok(ParsedCopy { target, columns, direction, options })
}

/// Reject a `COPY` statement recognized by the Simple Query engine (spec
/// §4.7 step 2b / §4.9 step 1). The statement is parsed far enough to name
/// its target and direction in the error text: this crate has no grounded,
/// real `CopyHandler` wiring to actually stream `CopyData` (see the module
/// docs above), so it reports the gap honestly rather than acknowledging
/// rows it never moved. Always returns an error; a malformed COPY statement
/// surfaces `parse_copy`'s own error instead.
pub fn dispatch_simple(sql: &str) -> IrisPgError {
    let parsed = match parse_copy(sql) {
        Ok(parsed) => parsed,
        Err(e) => return e,
    };
    let target = match &parsed.target {
        CopyTarget::Table(t) => t.clone(),
        CopyTarget::Query(q) => format!("({q})"),
    };
    let direction = match parsed.direction {
        CopyDirection::FromStdin => "FROM STDIN",
        CopyDirection::ToStdout => "TO STDOUT",
    };
    let named = format!("COPY {target} {direction}");
    crate::events::copy_rejected(&named);
    IrisPgError::CopyNotSupported(named)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_simple_rejects_copy_from_stdin_by_name() {
        match dispatch_simple("COPY patients (id, name) FROM STDIN") {
            IrisPgError::CopyNotSupported(msg) => {
                assert!(msg.contains("patients"), "expected target name in message: {msg}");
                assert!(msg.contains("FROM STDIN"));
            }
            other => panic!("expected CopyNotSupported, got {other:?}"),
        }
        assert_eq!(IrisPgError::CopyNotSupported(String::new()).sqlstate(), "0A000");
    }

    #[test]
    fn dispatch_simple_rejects_copy_to_stdout_by_query() {
        match dispatch_simple("COPY (SELECT id FROM patients) TO STDOUT") {
            IrisPgError::CopyNotSupported(msg) => assert!(msg.contains("TO STDOUT")),
            other => panic!("expected CopyNotSupported, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_simple_still_surfaces_a_parse_error_for_malformed_copy() {
        assert!(!matches!(dispatch_simple("COPY FROM STDIN"), IrisPgError::CopyNotSupported(_)));
    }

    #[test]
    fn parses_copy_from_stdin_with_columns_and_options() {
        let parsed = parse_copy(
            "COPY patients (id, name) FROM STDIN WITH (DELIMITER ',', NULL 'NA', HEADER true)",
        )
        .unwrap();
        assert!(matches!(parsed.target, CopyTarget::Table(ref t) if t == "patients"));
        assert_eq!(parsed.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(parsed.direction, CopyDirection::FromStdin);
        assert_eq!(parsed.options.null, "NA");
        assert!(parsed.options.header);
    }

    #[test]
    fn parses_copy_query_to_stdout() {
        let parsed = parse_copy("COPY (SELECT id FROM patients WHERE active = 1) TO STDOUT").unwrap();
        assert!(matches!(parsed.target, CopyTarget::Query(ref q) if q.starts_with("SELECT id")));
        assert_eq!(parsed.direction, CopyDirection::ToStdout);
    }

    #[test]
    fn defaults_match_spec_4_9() {
        let parsed = parse_copy("COPY t FROM STDIN").unwrap();
        assert_eq!(parsed.options.delimiter, b',');
        assert_eq!(parsed.options.quote, b'"');
        assert_eq!(parsed.options.escape, b'\\');
        assert_eq!(parsed.options.null, "\\N");
        assert!(!parsed.options.header);
    }

    #[test]
    fn rejects_unknown_option() {
        assert!(parse_copy("COPY t FROM STDIN WITH (BOGUS 1)").is_err());
    }
}
