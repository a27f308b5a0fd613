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

//! Links the IRIS Callin shared library when the `embedded-iris` feature
//! is enabled. The library itself is a system dependency supplied by an
//! IRIS installation (e.g. `$ISC_PACKAGE_INSTALLDIR/bin`), the same way
//! `openssl-sys`/`libpq-sys` expect the system to provide `libssl`/`libpq` —
//! nothing native is vendored or compiled by this crate.

fn main() {
    println!("cargo:rerun-if-env-changed=IRIS_CALLIN_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_EMBEDDED_IRIS").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("IRIS_CALLIN_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
    println!("cargo:rustc-link-lib=dylib=irisctl");
}
