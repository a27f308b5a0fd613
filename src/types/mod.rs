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

//! Type & OID registry (spec §4.3): the table mapping PostgreSQL OIDs to
//! logical types, text/binary codecs, and the wire-level [`Value`] sum type.

pub mod vector;

use pgwire::api::Type;

use crate::error::IrisPgError;

pub use vector::Vector;

/// Wire-level value: NULL is represented by the absence of bytes (wire
/// length field -1), never by an empty `Text`/`Binary` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(Vec<u8>),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Logical types this crate understands on the wire (spec §4.3 table plus
/// the VECTOR extension type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Bytea,
    Date,
    Time,
    TimestampTz,
    Uuid,
    Vector,
}

impl LogicalType {
    /// The OID this crate announces on the wire. `Vector`'s OID is
    /// configured (spec: "reserved OID, documented in ParameterStatus") —
    /// callers needing it should go through [`VECTOR_OID`] rather than this
    /// table, which is only correct for the built-in PostgreSQL types.
    pub fn oid(self) -> u32 {
        match self {
            LogicalType::Bool => 16,
            LogicalType::Int2 => 21,
            LogicalType::Int4 => 23,
            LogicalType::Int8 => 20,
            LogicalType::Float4 => 700,
            LogicalType::Float8 => 701,
            LogicalType::Numeric => 1700,
            LogicalType::Text => 25,
            LogicalType::Bytea => 17,
            LogicalType::Date => 1082,
            LogicalType::Time => 1083,
            LogicalType::TimestampTz => 1184,
            LogicalType::Uuid => 2950,
            LogicalType::Vector => VECTOR_OID,
        }
    }

    pub fn from_oid(oid: u32) -> Option<Self> {
        Some(match oid {
            16 => LogicalType::Bool,
            21 => LogicalType::Int2,
            23 => LogicalType::Int4,
            20 => LogicalType::Int8,
            700 => LogicalType::Float4,
            701 => LogicalType::Float8,
            1700 => LogicalType::Numeric,
            25 | 1043 => LogicalType::Text,
            17 => LogicalType::Bytea,
            1082 => LogicalType::Date,
            1083 => LogicalType::Time,
            1184 => LogicalType::TimestampTz,
            2950 => LogicalType::Uuid,
            VECTOR_OID => LogicalType::Vector,
            _ => return None,
        })
    }

    /// `pgwire::api::Type` used to build `FieldInfo` for this logical type.
    /// VARCHAR stands in for VECTOR: pgwire has no built-in vector type and
    /// spec §4.3 only requires a text encoding for it anyway ("not
    /// supported" in binary — "emit text").
    pub fn pg_type(self) -> Type {
        match self {
            LogicalType::Bool => Type::BOOL,
            LogicalType::Int2 => Type::INT2,
            LogicalType::Int4 => Type::INT4,
            LogicalType::Int8 => Type::INT8,
            LogicalType::Float4 => Type::FLOAT4,
            LogicalType::Float8 => Type::FLOAT8,
            LogicalType::Numeric => Type::NUMERIC,
            LogicalType::Text => Type::TEXT,
            LogicalType::Bytea => Type::BYTEA,
            LogicalType::Date => Type::DATE,
            LogicalType::Time => Type::TIME,
            LogicalType::TimestampTz => Type::TIMESTAMPTZ,
            LogicalType::Uuid => Type::UUID,
            LogicalType::Vector => Type::VARCHAR,
        }
    }
}

/// Stable, session-wide OID reserved for the VECTOR logical type. Real
/// deployments of pgvector register a dynamic OID per-database; this crate
/// instead fixes one and announces it via `ParameterStatus` at startup
/// (spec §4.1 step 6 addition, see SPEC_FULL.md §4.1), matching how a
/// front end that owns its own catalog (rather than reading `pg_type`) can
/// keep the value fixed for the lifetime of the session.
pub const VECTOR_OID: u32 = 16_385;

/// Decode wire bytes for `oid`/`format` into a backend-acceptable [`Value`].
/// `format` is 0 (text) or 1 (binary) per spec §4.3.
pub fn decode(oid: u32, format: i16, bytes: Option<&[u8]>) -> Result<Value, IrisPgError> {
    let Some(bytes) = bytes else {
        return Ok(Value::Null);
    };
    let ty = LogicalType::from_oid(oid);
    match format {
        0 => {
            if ty.is_none() {
                return Ok(Value::Text(bytes.to_vec()));
            }
            Ok(Value::Text(bytes.to_vec()))
        }
        1 => validate_binary(ty, bytes).map(|_| Value::Binary(bytes.to_vec())),
        other => Err(IrisPgError::Protocol(format!("unknown format code {other}"))),
    }
}

fn validate_binary(ty: Option<LogicalType>, bytes: &[u8]) -> Result<(), IrisPgError> {
    let Some(ty) = ty else { return Ok(()) };
    let expected_len = match ty {
        LogicalType::Bool => Some(1),
        LogicalType::Int2 => Some(2),
        LogicalType::Int4 | LogicalType::Float4 | LogicalType::Date => Some(4),
        LogicalType::Int8 | LogicalType::Float8 | LogicalType::Time | LogicalType::TimestampTz => {
            Some(8)
        }
        LogicalType::Uuid => Some(16),
        LogicalType::Text | LogicalType::Bytea | LogicalType::Numeric | LogicalType::Vector => None,
    };
    if let Some(len) = expected_len {
        if bytes.len() != len {
            return Err(IrisPgError::InvalidBinaryRepresentation(format!(
                "expected {len} bytes for {ty:?}, got {}",
                bytes.len()
            )));
        }
    }
    Ok(())
}

/// A value as IRIS hands it back, before wire encoding. This is the shape
/// an [`crate::executor::Executor`] produces; [`encode`] turns it into the
/// [`Value`] the frame codec writes.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Days since the Unix epoch.
    Date(i32),
    /// Microseconds since midnight.
    Time(i64),
    /// Microseconds since 2000-01-01 UTC (PostgreSQL epoch), per spec's
    /// binary timestamptz encoding.
    TimestampTz(i64),
    Uuid([u8; 16]),
    Vector(Vector),
}

/// Encode a backend-native value as wire bytes for the given OID/format.
pub fn encode(oid: u32, format: i16, value: &BackendValue) -> Result<Value, IrisPgError> {
    if matches!(value, BackendValue::Null) {
        return Ok(Value::Null);
    }
    let binary = format == 1;
    match (LogicalType::from_oid(oid), value) {
        (_, BackendValue::Null) => Ok(Value::Null),
        (Some(LogicalType::Bool), BackendValue::Bool(b)) => Ok(if binary {
            Value::Binary(vec![*b as u8])
        } else {
            Value::Text(if *b { b"t".to_vec() } else { b"f".to_vec() })
        }),
        (Some(LogicalType::Int2), BackendValue::I64(v)) => Ok(if binary {
            Value::Binary((*v as i16).to_be_bytes().to_vec())
        } else {
            Value::Text(v.to_string().into_bytes())
        }),
        (Some(LogicalType::Int4), BackendValue::I64(v)) => Ok(if binary {
            Value::Binary((*v as i32).to_be_bytes().to_vec())
        } else {
            Value::Text(v.to_string().into_bytes())
        }),
        (Some(LogicalType::Int8), BackendValue::I64(v)) => Ok(if binary {
            Value::Binary(v.to_be_bytes().to_vec())
        } else {
            Value::Text(v.to_string().into_bytes())
        }),
        (Some(LogicalType::Float4), BackendValue::F64(v)) => Ok(if binary {
            Value::Binary((*v as f32).to_be_bytes().to_vec())
        } else {
            Value::Text(format_float(*v).into_bytes())
        }),
        (Some(LogicalType::Float8), BackendValue::F64(v)) => Ok(if binary {
            Value::Binary(v.to_be_bytes().to_vec())
        } else {
            Value::Text(format_float(*v).into_bytes())
        }),
        (Some(LogicalType::Date), BackendValue::Date(days)) => Ok(if binary {
            Value::Binary((days - PG_EPOCH_DAYS).to_be_bytes().to_vec())
        } else {
            Value::Text(date_to_iso(*days).into_bytes())
        }),
        (Some(LogicalType::Time), BackendValue::Time(micros)) => Ok(if binary {
            Value::Binary(micros.to_be_bytes().to_vec())
        } else {
            Value::Text(time_to_text(*micros).into_bytes())
        }),
        (Some(LogicalType::TimestampTz), BackendValue::TimestampTz(micros)) => Ok(if binary {
            Value::Binary(micros.to_be_bytes().to_vec())
        } else {
            Value::Text(timestamptz_to_iso(*micros).into_bytes())
        }),
        (Some(LogicalType::Uuid), BackendValue::Uuid(bytes)) => Ok(if binary {
            Value::Binary(bytes.to_vec())
        } else {
            Value::Text(uuid_to_text(bytes).into_bytes())
        }),
        (Some(LogicalType::Bytea), BackendValue::Bytes(b)) => Ok(if binary {
            Value::Binary(b.clone())
        } else {
            Value::Text(bytea_to_hex(b).into_bytes())
        }),
        (Some(LogicalType::Vector), BackendValue::Vector(v)) => {
            // Binary vectors are never supported (spec §4.3 table); always
            // fall back to text even if the client requested binary.
            Ok(Value::Text(v.to_text().into_bytes()))
        }
        (_, BackendValue::Str(s)) => Ok(Value::Text(s.clone().into_bytes())),
        (_, BackendValue::Bytes(b)) if binary => Ok(Value::Binary(b.clone())),
        (_, other) => Err(IrisPgError::Internal(format!(
            "cannot encode {other:?} for oid {oid} format {format}"
        ))),
    }
}

/// Render a backend value as the text-protocol string the query engines
/// push through `pgwire`'s `DataRowEncoder` (spec §4.3/§4.7/§4.8). Every
/// retrieved pgwire server in this crate's lineage renders rows as
/// `Option<String>` regardless of the client's requested column format, so
/// this crate follows the same convention rather than fighting the
/// encoder's generic `ToSqlText` surface for a handful of binary-eligible
/// types; `encode`'s binary branch stays exercised directly by callers that
/// need it (and by its own unit tests) even though the wire path here
/// always renders text.
pub fn encode_text(oid: u32, value: &BackendValue) -> Result<Option<String>, IrisPgError> {
    if matches!(value, BackendValue::Null) {
        return Ok(None);
    }
    match encode(oid, 0, value)? {
        Value::Text(bytes) | Value::Binary(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Value::Null => Ok(None),
    }
}

/// Decode a Bind parameter's wire bytes into a backend-native value, the
/// inverse of [`encode`], given the OID the client declared for it at Parse
/// time (spec §4.3/§4.8). `format` is 0 (text) or 1 (binary); an OID this
/// registry doesn't recognize is always treated as opaque text, matching
/// [`decode`]'s own fallback.
pub fn decode_param(oid: u32, format: i16, bytes: Option<&[u8]>) -> Result<BackendValue, IrisPgError> {
    let value = decode(oid, format, bytes)?;
    let raw = match &value {
        Value::Null => return Ok(BackendValue::Null),
        Value::Text(b) | Value::Binary(b) => b.as_slice(),
    };
    let binary = format == 1;
    match LogicalType::from_oid(oid) {
        None => Ok(BackendValue::Str(text_of(raw)?)),
        Some(LogicalType::Bool) => Ok(BackendValue::Bool(if binary {
            raw.first().copied().unwrap_or(0) != 0
        } else {
            matches!(raw, b"t" | b"true" | b"TRUE" | b"1" | b"y" | b"yes")
        })),
        Some(LogicalType::Int2) => Ok(BackendValue::I64(if binary {
            i16::from_be_bytes(fixed(raw)?) as i64
        } else {
            parse_text_i64(raw)?
        })),
        Some(LogicalType::Int4) => Ok(BackendValue::I64(if binary {
            i32::from_be_bytes(fixed(raw)?) as i64
        } else {
            parse_text_i64(raw)?
        })),
        Some(LogicalType::Int8) => Ok(BackendValue::I64(if binary {
            i64::from_be_bytes(fixed(raw)?)
        } else {
            parse_text_i64(raw)?
        })),
        Some(LogicalType::Float4) => Ok(BackendValue::F64(if binary {
            f32::from_be_bytes(fixed(raw)?) as f64
        } else {
            parse_text_f64(raw)?
        })),
        Some(LogicalType::Float8) => Ok(BackendValue::F64(if binary {
            f64::from_be_bytes(fixed(raw)?)
        } else {
            parse_text_f64(raw)?
        })),
        Some(LogicalType::Numeric) | Some(LogicalType::Text) => Ok(BackendValue::Str(text_of(raw)?)),
        Some(LogicalType::Bytea) => Ok(BackendValue::Bytes(if binary {
            raw.to_vec()
        } else {
            parse_bytea_text(raw)?
        })),
        Some(LogicalType::Date) => Ok(BackendValue::Date(if binary {
            i32::from_be_bytes(fixed(raw)?) + PG_EPOCH_DAYS
        } else {
            parse_date_text(&text_of(raw)?)?
        })),
        Some(LogicalType::Time) => Ok(BackendValue::Time(if binary {
            i64::from_be_bytes(fixed(raw)?)
        } else {
            parse_time_text(&text_of(raw)?)?
        })),
        Some(LogicalType::TimestampTz) => Ok(BackendValue::TimestampTz(if binary {
            i64::from_be_bytes(fixed(raw)?)
        } else {
            parse_timestamptz_text(&text_of(raw)?)?
        })),
        Some(LogicalType::Uuid) => Ok(BackendValue::Uuid(if binary {
            fixed(raw)?
        } else {
            parse_uuid_text(&text_of(raw)?)?
        })),
        Some(LogicalType::Vector) => Ok(BackendValue::Vector(Vector::parse(&text_of(raw)?)?)),
    }
}

fn text_of(raw: &[u8]) -> Result<String, IrisPgError> {
    String::from_utf8(raw.to_vec())
        .map_err(|e| IrisPgError::InvalidTextRepresentation(e.to_string()))
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N], IrisPgError> {
    raw.try_into().map_err(|_| {
        IrisPgError::InvalidBinaryRepresentation(format!("expected {N} bytes, got {}", raw.len()))
    })
}

fn parse_text_i64(raw: &[u8]) -> Result<i64, IrisPgError> {
    text_of(raw)?
        .trim()
        .parse::<i64>()
        .map_err(|e| IrisPgError::InvalidTextRepresentation(e.to_string()))
}

fn parse_text_f64(raw: &[u8]) -> Result<f64, IrisPgError> {
    text_of(raw)?
        .trim()
        .parse::<f64>()
        .map_err(|e| IrisPgError::InvalidTextRepresentation(e.to_string()))
}

/// `\x`-prefixed hex, the only bytea text format this crate accepts on input
/// (PostgreSQL's legacy escape format is not supported).
fn parse_bytea_text(raw: &[u8]) -> Result<Vec<u8>, IrisPgError> {
    let text = text_of(raw)?;
    let hex = text.strip_prefix("\\x").ok_or_else(|| {
        IrisPgError::InvalidTextRepresentation(format!("bytea literal {text:?} is missing \\x prefix"))
    })?;
    if hex.len() % 2 != 0 {
        return Err(IrisPgError::InvalidTextRepresentation(format!(
            "bytea literal {text:?} has an odd number of hex digits"
        )));
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|e| IrisPgError::InvalidTextRepresentation(e.to_string()))?;
        out.push(byte);
    }
    Ok(out)
}

fn parse_date_text(text: &str) -> Result<i32, IrisPgError> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(IrisPgError::InvalidTextRepresentation(format!(
            "invalid date literal {text:?}"
        )));
    }
    let bad = || IrisPgError::InvalidTextRepresentation(format!("invalid date literal {text:?}"));
    let year: i64 = text[0..4].parse().map_err(|_| bad())?;
    let month: i64 = text[5..7].parse().map_err(|_| bad())?;
    let day: i64 = text[8..10].parse().map_err(|_| bad())?;
    Ok(days_from_civil(year, month, day) as i32)
}

fn parse_time_text(text: &str) -> Result<i64, IrisPgError> {
    let bad = || IrisPgError::InvalidTextRepresentation(format!("invalid time literal {text:?}"));
    let mut parts = text.splitn(2, '.');
    let hms = parts.next().ok_or_else(bad)?;
    let frac_str = parts.next();
    let mut hms_parts = hms.splitn(3, ':');
    let h: i64 = hms_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let m: i64 = hms_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let s: i64 = hms_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let frac_micros = match frac_str {
        Some(f) => {
            let mut padded = f.to_string();
            while padded.len() < 6 {
                padded.push('0');
            }
            padded.truncate(6);
            padded.parse::<i64>().map_err(|_| bad())?
        }
        None => 0,
    };
    Ok(((h * 3600 + m * 60 + s) * 1_000_000) + frac_micros)
}

fn parse_timestamptz_text(text: &str) -> Result<i64, IrisPgError> {
    let bad = || IrisPgError::InvalidTextRepresentation(format!("invalid timestamptz literal {text:?}"));
    let trimmed = text
        .trim_end_matches("+00")
        .trim_end_matches("Z")
        .trim_end();
    let mut parts = trimmed.splitn(2, ' ');
    let date_part = parts.next().ok_or_else(bad)?;
    let time_part = parts.next().ok_or_else(bad)?;
    let days = parse_date_text(date_part)? as i64;
    let micros = parse_time_text(time_part)?;
    let unix_micros = days * 86_400_000_000 + micros;
    Ok(unix_micros - PG_EPOCH_DAYS as i64 * 86_400_000_000)
}

fn parse_uuid_text(text: &str) -> Result<[u8; 16], IrisPgError> {
    let bad = || IrisPgError::InvalidTextRepresentation(format!("invalid uuid literal {text:?}"));
    let hex: String = text.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return Err(bad());
    }
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
    }
    Ok(out)
}

/// Day count relative to the Unix epoch for a civil calendar date, the
/// inverse of [`civil_from_days`] (same Howard Hinnant algorithm).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 } as u64;
    let doy = (153 * mp + 2) / 5 + d as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

/// Build the `FieldInfo` a row descriptor needs for `field`, falling back to
/// `VARCHAR` for an OID this registry doesn't recognize (e.g. a backend
/// catalog type with no PostgreSQL analogue).
pub fn field_info(field: &crate::executor::Field) -> pgwire::api::results::FieldInfo {
    let ty = LogicalType::from_oid(field.oid)
        .map(LogicalType::pg_type)
        .unwrap_or(Type::VARCHAR);
    pgwire::api::results::FieldInfo::new(
        field.name.clone(),
        None,
        None,
        ty,
        pgwire::api::results::FieldFormat::Text,
    )
}

const PG_EPOCH_DAYS: i32 = 10_957; // 2000-01-01 relative to the Unix epoch

fn format_float(v: f64) -> String {
    let mut s = format!("{v}");
    if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN") {
        s.push_str(".0");
    }
    s
}

fn date_to_iso(unix_days: i32) -> String {
    civil_from_days(unix_days as i64)
}

fn time_to_text(micros: i64) -> String {
    let total_secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    if frac == 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}.{frac:06}")
    }
}

fn timestamptz_to_iso(pg_epoch_micros: i64) -> String {
    let unix_micros = pg_epoch_micros + PG_EPOCH_DAYS as i64 * 86_400_000_000;
    let days = unix_micros.div_euclid(86_400_000_000);
    let rem = unix_micros.rem_euclid(86_400_000_000);
    format!("{} {}+00", civil_from_days(days), time_to_text(rem))
}

/// Civil calendar date from a day count relative to the Unix epoch, using
/// Howard Hinnant's well-known `civil_from_days` algorithm.
fn civil_from_days(z: i64) -> String {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{y:04}-{m:02}-{d:02}")
}

fn uuid_to_text(bytes: &[u8; 16]) -> String {
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

fn bytea_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("\\x");
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_round_trips_through_logical_type() {
        for ty in [
            LogicalType::Bool,
            LogicalType::Int2,
            LogicalType::Int4,
            LogicalType::Int8,
            LogicalType::Float4,
            LogicalType::Float8,
            LogicalType::Text,
            LogicalType::Bytea,
            LogicalType::Date,
            LogicalType::Time,
            LogicalType::TimestampTz,
            LogicalType::Uuid,
        ] {
            assert_eq!(LogicalType::from_oid(ty.oid()), Some(ty));
        }
    }

    #[test]
    fn null_decodes_regardless_of_format() {
        assert_eq!(decode(23, 0, None).unwrap(), Value::Null);
        assert_eq!(decode(23, 1, None).unwrap(), Value::Null);
    }

    #[test]
    fn binary_int4_wrong_length_is_rejected() {
        let err = decode(23, 1, Some(&[0u8; 3])).unwrap_err();
        assert_eq!(err.sqlstate(), "22P03");
    }

    #[test]
    fn unknown_format_code_is_protocol_error() {
        let err = decode(23, 2, Some(&[0u8; 4])).unwrap_err();
        assert_eq!(err.sqlstate(), "08P01");
    }

    #[test]
    fn encode_int4_text_and_binary() {
        let v = encode(23, 0, &BackendValue::I64(42)).unwrap();
        assert_eq!(v, Value::Text(b"42".to_vec()));
        let v = encode(23, 1, &BackendValue::I64(42)).unwrap();
        assert_eq!(v, Value::Binary(42i32.to_be_bytes().to_vec()));
    }

    #[test]
    fn encode_bool_text() {
        assert_eq!(
            encode(16, 0, &BackendValue::Bool(true)).unwrap(),
            Value::Text(b"t".to_vec())
        );
        assert_eq!(
            encode(16, 0, &BackendValue::Bool(false)).unwrap(),
            Value::Text(b"f".to_vec())
        );
    }

    #[test]
    fn encode_null_ignores_format() {
        assert_eq!(encode(23, 1, &BackendValue::Null).unwrap(), Value::Null);
    }

    #[test]
    fn encode_date_roundtrip_text() {
        // 2000-01-01 is day 10957 since the Unix epoch.
        let v = encode(1082, 0, &BackendValue::Date(10_957)).unwrap();
        assert_eq!(v, Value::Text(b"2000-01-01".to_vec()));
    }

    #[test]
    fn vector_is_always_text_even_if_binary_requested() {
        let vec = Vector::from_f32(vec![0.1, 0.2, 0.3]);
        let v = encode(VECTOR_OID, 1, &BackendValue::Vector(vec)).unwrap();
        assert!(matches!(v, Value::Text(_)));
    }

    #[test]
    fn bytea_text_is_hex_prefixed() {
        let v = encode(17, 0, &BackendValue::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(v, Value::Text(b"\\xdead".to_vec()));
    }

    #[test]
    fn decode_param_text_int4() {
        let v = decode_param(23, 0, Some(b"42")).unwrap();
        assert_eq!(v, BackendValue::I64(42));
    }

    #[test]
    fn decode_param_binary_int4() {
        let v = decode_param(23, 1, Some(&42i32.to_be_bytes())).unwrap();
        assert_eq!(v, BackendValue::I64(42));
    }

    #[test]
    fn decode_param_null_is_null_regardless_of_oid() {
        assert_eq!(decode_param(23, 0, None).unwrap(), BackendValue::Null);
    }

    #[test]
    fn decode_param_date_roundtrips_through_encode() {
        let v = decode_param(1082, 0, Some(b"2000-01-01")).unwrap();
        assert_eq!(v, BackendValue::Date(10_957));
        let back = encode(1082, 0, &v).unwrap();
        assert_eq!(back, Value::Text(b"2000-01-01".to_vec()));
    }

    #[test]
    fn decode_param_timestamptz_roundtrips() {
        let v = decode_param(1184, 0, Some(b"2000-01-01 00:00:00+00")).unwrap();
        assert_eq!(v, BackendValue::TimestampTz(0));
    }

    #[test]
    fn decode_param_vector_text() {
        let v = decode_param(VECTOR_OID, 0, Some(b"[0.1,0.2,0.3]")).unwrap();
        assert!(matches!(v, BackendValue::Vector(_)));
    }

    #[test]
    fn decode_param_bytea_hex() {
        let v = decode_param(17, 0, Some(b"\\xdead")).unwrap();
        assert_eq!(v, BackendValue::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn decode_param_unknown_oid_falls_back_to_text() {
        let v = decode_param(99999, 0, Some(b"hello")).unwrap();
        assert_eq!(v, BackendValue::Str("hello".to_string()));
    }

    #[test]
    fn decode_param_bool_text_variants() {
        assert_eq!(decode_param(16, 0, Some(b"t")).unwrap(), BackendValue::Bool(true));
        assert_eq!(decode_param(16, 0, Some(b"f")).unwrap(), BackendValue::Bool(false));
    }
}
