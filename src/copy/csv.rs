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

//! CSV dialect options for the COPY subsystem (spec §4.9). The row-level
//! parsing/writing this module used to carry moved with `COPY`'s actual
//! data transfer; see `crate::copy`'s module docs for why that transfer
//! isn't wired up. `CopyOptions` survives because `crate::copy::parse_copy`
//! still needs it to validate a COPY statement's `WITH (...)` clause before
//! rejecting it.

/// Per-COPY dialect knobs (spec §4.9 step 3: "delimiter default `,`, quote
/// default `"`, escape default `\`, null-sentinel default `\N`, header
/// flag").
#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: u8,
    pub null: String,
    pub header: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        CopyOptions {
            delimiter: b',',
            quote: b'"',
            escape: b'\\',
            null: "\\N".to_string(),
            header: false,
        }
    }
}

