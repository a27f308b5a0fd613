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

//! VECTOR logical type (spec §3, §4.3): an ordered list of floats with
//! dimension 1..=2048, text-encoded as `[v0,v1,...]` — the format pgvector
//! uses on the wire, which this crate's translator also rewrites
//! `<->`/`<=>`/`<#>` operators into `TO_VECTOR(...)` calls around.

use crate::error::IrisPgError;

pub const MAX_DIMS: usize = 2048;
pub const MIN_DIMS: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    dims: Vec<f32>,
}

impl Vector {
    pub fn from_f32(dims: Vec<f32>) -> Self {
        Vector { dims }
    }

    pub fn dims(&self) -> &[f32] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Render as the pgvector text format: `[v0,v1,...]`.
    pub fn to_text(&self) -> String {
        let mut s = String::with_capacity(2 + self.dims.len() * 8);
        s.push('[');
        for (i, v) in self.dims.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            s.push_str(&format_component(*v));
        }
        s.push(']');
        s
    }

    /// Parse the pgvector text format, validating dimension bounds (spec
    /// §3: "dimension 1..2048").
    pub fn parse(text: &str) -> Result<Self, IrisPgError> {
        let inner = text
            .trim()
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| {
                IrisPgError::InvalidTextRepresentation(format!(
                    "vector literal must be bracketed: {text}"
                ))
            })?;
        let inner = inner.trim();
        let dims: Vec<f32> = if inner.is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|tok| {
                    tok.trim().parse::<f32>().map_err(|e| {
                        IrisPgError::InvalidTextRepresentation(format!(
                            "invalid vector component {tok:?}: {e}"
                        ))
                    })
                })
                .collect::<Result<_, _>>()?
        };
        if dims.len() < MIN_DIMS || dims.len() > MAX_DIMS {
            return Err(IrisPgError::InvalidTextRepresentation(format!(
                "vector dimension {} out of range 1..={MAX_DIMS}",
                dims.len()
            )));
        }
        Ok(Vector { dims })
    }
}

fn format_component(v: f32) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{v}")
    } else {
        format!("{v}")
    }
}

/// True if `text` (already unquoted) looks like a bracketed vector literal,
/// used by the translator's vector-operator stage to decide whether to
/// preserve brackets around a `TO_VECTOR(...)` argument (spec §4.4 rule 4).
pub fn looks_bracketed(text: &str) -> bool {
    let t = text.trim();
    t.starts_with('[') && t.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_vector() {
        let v = Vector::parse("[0.1,0.2,0.3]").unwrap();
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn rejects_unbracketed() {
        assert!(Vector::parse("0.1,0.2").is_err());
    }

    #[test]
    fn rejects_zero_dims() {
        assert!(Vector::parse("[]").is_err());
    }

    #[test]
    fn rejects_too_many_dims() {
        let many = (0..MAX_DIMS + 1)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        assert!(Vector::parse(&format!("[{many}]")).is_err());
    }

    #[test]
    fn text_round_trip_preserves_brackets() {
        let v = Vector::parse("[1,2,3]").unwrap();
        assert!(looks_bracketed(&v.to_text()));
    }
}
