//! C FFI bindings for u-compare.
//!
//! Exposes table analysis and column comparison through a C-compatible
//! interface. Results cross the boundary as JSON documents, the same
//! shape the CLI prints.
//!
//! # Design
//!
//! - **JSON out-parameters**: results are written to `*mut *mut c_char`
//!   and must be released with [`compare_string_free`]
//! - **Integer error codes**: 0 = success, negative = error
//! - **Thread-local error message**: [`compare_last_error`]
//! - **`catch_unwind`**: all FFI entry points wrapped to prevent panic propagation
//!
//! # Safety
//!
//! Null pointer arguments return error code -1. Optional arguments are
//! documented as such and may be null.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic;
use std::ptr;

use crate::compare::ComparisonRequest;
use crate::config::CompareConfig;
use crate::csv_parser::CsvParser;
use crate::dataframe::DataFrame;
use crate::error::CompareError;
use crate::profiling::analyze;
use crate::render::SvgRenderer;

// ── Error handling ────────────────────────────────────────────────────

/// Error codes returned by FFI functions.
pub const COMPARE_OK: i32 = 0;
pub const COMPARE_ERR_NULL_PTR: i32 = -1;
pub const COMPARE_ERR_INVALID_INPUT: i32 = -2;
pub const COMPARE_ERR_PARSE_FAILED: i32 = -3;
pub const COMPARE_ERR_ANALYSIS_FAILED: i32 = -4;
pub const COMPARE_ERR_PANIC: i32 = -99;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = CString::new(msg).ok();
    });
}

/// Records `err` and returns its code.
fn fail(err: &CompareError) -> i32 {
    set_last_error(&err.to_string());
    error_code(err)
}

/// Maps a request error onto an FFI error code.
pub fn error_code(err: &CompareError) -> i32 {
    match err {
        CompareError::CsvParse { .. }
        | CompareError::EmptyInput
        | CompareError::Decode { .. }
        | CompareError::Workbook { .. }
        | CompareError::UnsupportedFormat { .. } => COMPARE_ERR_PARSE_FAILED,
        CompareError::Unreadable { .. } => COMPARE_ERR_INVALID_INPUT,
        CompareError::ColumnNotFound { .. } | CompareError::DimensionMismatch { .. } => {
            COMPARE_ERR_INVALID_INPUT
        }
        CompareError::Io(_) | CompareError::Internal(_) => COMPARE_ERR_ANALYSIS_FAILED,
    }
}

/// Returns the last error message, or null if no error.
/// The returned string is valid until the next FFI call on this thread.
///
/// # Safety
/// The caller must not free the returned pointer.
#[no_mangle]
pub extern "C" fn compare_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cstr) => cstr.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn compare_clear_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

// ── Argument helpers ──────────────────────────────────────────────────

/// Borrows a required C string argument.
///
/// # Safety
/// `p` must be null or a valid null-terminated string outliving `'a`.
unsafe fn required_str<'a>(p: *const c_char, name: &str) -> Result<&'a str, i32> {
    if p.is_null() {
        set_last_error(&format!("null {name} pointer"));
        return Err(COMPARE_ERR_NULL_PTR);
    }
    unsafe { CStr::from_ptr(p) }.to_str().map_err(|e| {
        set_last_error(&format!("invalid UTF-8 in {name}: {e}"));
        COMPARE_ERR_INVALID_INPUT
    })
}

/// Parses the optional JSON config argument; null means defaults.
///
/// # Safety
/// `p` must be null or a valid null-terminated string.
unsafe fn optional_config(p: *const c_char) -> Result<CompareConfig, i32> {
    if p.is_null() {
        return Ok(CompareConfig::default());
    }
    let json = unsafe { required_str(p, "config_json") }?;
    CompareConfig::from_json(json).map_err(|e| {
        set_last_error(&e.to_string());
        COMPARE_ERR_INVALID_INPUT
    })
}

/// Hands a JSON document to the caller through `out`.
///
/// # Safety
/// `out` must be a valid, non-null pointer.
unsafe fn write_json<T: serde::Serialize>(value: &T, out: *mut *mut c_char) -> i32 {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => return fail(&CompareError::Internal(format!("serialization failed: {e}"))),
    };
    match CString::new(json) {
        Ok(cstr) => {
            unsafe { *out = cstr.into_raw() };
            COMPARE_OK
        }
        Err(e) => {
            set_last_error(&format!("result contains NUL byte: {e}"));
            COMPARE_ERR_ANALYSIS_FAILED
        }
    }
}

/// Parses CSV text, rejecting tables without rows.
fn parse_table(csv: &str) -> Result<DataFrame, CompareError> {
    let df = CsvParser::new().parse_str(csv)?;
    if df.is_empty() || df.row_count() == 0 {
        return Err(CompareError::EmptyInput);
    }
    Ok(df)
}

// ── Analysis ──────────────────────────────────────────────────────────

/// Profiles every column of a CSV table and writes the analysis report
/// as JSON to `*out_json`.
///
/// # Safety
/// - `csv_data` must be a valid null-terminated UTF-8 string.
/// - `config_json` may be null (defaults) or a null-terminated JSON string.
/// - `out_json` must be non-null; on success `*out_json` must be freed
///   with `compare_string_free`.
#[no_mangle]
pub unsafe extern "C" fn compare_analyze_csv(
    csv_data: *const c_char,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if out_json.is_null() {
            set_last_error("null out_json pointer");
            return COMPARE_ERR_NULL_PTR;
        }
        let csv = match unsafe { required_str(csv_data, "csv_data") } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let config = match unsafe { optional_config(config_json) } {
            Ok(c) => c,
            Err(code) => return code,
        };

        let report =
            parse_table(csv).and_then(|df| analyze(&df, &config, &SvgRenderer::default()));
        match report {
            Ok(report) => unsafe { write_json(&report, out_json) },
            Err(e) => fail(&e),
        }
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error("panic in compare_analyze_csv");
            COMPARE_ERR_PANIC
        }
    }
}

// ── Comparison ────────────────────────────────────────────────────────

/// Compares two columns of a CSV table and writes the comparison result
/// as JSON to `*out_json`.
///
/// An unsupported pair of column types is not an error: it yields a
/// result whose `type` is `"invalid"`.
///
/// # Safety
/// - `csv_data`, `group_col` and `value_col` must be valid null-terminated
///   UTF-8 strings.
/// - `config_json` may be null (defaults) or a null-terminated JSON string.
/// - `out_json` must be non-null; on success `*out_json` must be freed
///   with `compare_string_free`.
#[no_mangle]
pub unsafe extern "C" fn compare_columns_csv(
    csv_data: *const c_char,
    group_col: *const c_char,
    value_col: *const c_char,
    config_json: *const c_char,
    out_json: *mut *mut c_char,
) -> i32 {
    let result = panic::catch_unwind(|| {
        if out_json.is_null() {
            set_last_error("null out_json pointer");
            return COMPARE_ERR_NULL_PTR;
        }
        let csv = match unsafe { required_str(csv_data, "csv_data") } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let group = match unsafe { required_str(group_col, "group_col") } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let value = match unsafe { required_str(value_col, "value_col") } {
            Ok(s) => s,
            Err(code) => return code,
        };
        let config = match unsafe { optional_config(config_json) } {
            Ok(c) => c,
            Err(code) => return code,
        };

        let request = ComparisonRequest::new(group, value);
        let outcome = parse_table(csv)
            .and_then(|df| request.run(&df, &config, &SvgRenderer::default()));
        match outcome {
            Ok(result) => unsafe { write_json(&result, out_json) },
            Err(e) => fail(&e),
        }
    });

    match result {
        Ok(code) => code,
        Err(_) => {
            set_last_error("panic in compare_columns_csv");
            COMPARE_ERR_PANIC
        }
    }
}

/// Frees a string returned through an `out_json` parameter.
///
/// # Safety
/// `s` must be a pointer produced by this library, or null.
#[no_mangle]
pub unsafe extern "C" fn compare_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = unsafe { CString::from_raw(s) };
    }
}

// ── Version ──────────────────────────────────────────────────────────

/// Returns the version string of u-compare.
///
/// # Safety
/// The returned string is static. Do not free it.
#[no_mangle]
pub extern "C" fn compare_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn take_json(p: *mut c_char) -> serde_json::Value {
        let text = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        unsafe { compare_string_free(p) };
        serde_json::from_str(&text).unwrap()
    }

    fn last_error() -> String {
        unsafe { CStr::from_ptr(compare_last_error()) }
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn ffi_version() {
        let v = compare_version();
        let s = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(s, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn client_errors_never_report_analysis_failure() {
        let unreadable = CompareError::Unreadable {
            path: "in.csv".into(),
            message: "gone".into(),
        };
        assert_eq!(error_code(&unreadable), COMPARE_ERR_INVALID_INPUT);
        assert_eq!(error_code(&CompareError::Io("disk".into())), COMPARE_ERR_ANALYSIS_FAILED);
    }

    #[test]
    fn ffi_error_lifecycle() {
        compare_clear_error();
        assert!(compare_last_error().is_null());

        set_last_error("test error");
        assert_eq!(last_error(), "test error");

        compare_clear_error();
        assert!(compare_last_error().is_null());
    }

    #[test]
    fn ffi_analyze_roundtrip() {
        let csv = CString::new("name,value\nAlice,1.5\nBob,2.3\n").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_analyze_csv(csv.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_OK);
        let json = take_json(out);
        assert_eq!(json["file_info"]["rows"], 2);
        assert_eq!(json["analysis"][1]["type"], "numeric");
    }

    #[test]
    fn ffi_compare_group_comparison() {
        let csv = CString::new("group,value\na,10\na,20\nb,30\n").unwrap();
        let g = CString::new("group").unwrap();
        let v = CString::new("value").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_columns_csv(csv.as_ptr(), g.as_ptr(), v.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_OK);
        let json = take_json(out);
        assert_eq!(json["type"], "group_comparison");
        assert_eq!(json["data"]["a"]["count"], 2);
    }

    #[test]
    fn ffi_compare_unknown_column() {
        let csv = CString::new("a,b\n1,2\n").unwrap();
        let g = CString::new("missing").unwrap();
        let v = CString::new("b").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_columns_csv(csv.as_ptr(), g.as_ptr(), v.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_ERR_INVALID_INPUT);
        assert!(out.is_null());
        assert!(last_error().contains("Column 'missing' not found"));
    }

    #[test]
    fn ffi_compare_with_config() {
        let csv = CString::new("x,y\n1,2\n2,4\n3,7\n").unwrap();
        let x = CString::new("x").unwrap();
        let y = CString::new("y").unwrap();
        let config = CString::new(r#"{"scatter_sample_size": 2, "sample_seed": 1}"#).unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_columns_csv(csv.as_ptr(), x.as_ptr(), y.as_ptr(), config.as_ptr(), &mut out) };
        assert_eq!(rc, COMPARE_OK);
        assert_eq!(take_json(out)["type"], "correlation");
    }

    #[test]
    fn ffi_bad_config() {
        let csv = CString::new("x\n1\n").unwrap();
        let config = CString::new("{broken").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_analyze_csv(csv.as_ptr(), config.as_ptr(), &mut out) };
        assert_eq!(rc, COMPARE_ERR_INVALID_INPUT);
    }

    #[test]
    fn ffi_null_pointers() {
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_analyze_csv(ptr::null(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_ERR_NULL_PTR);
        let csv = CString::new("x\n1\n").unwrap();
        let rc = unsafe { compare_analyze_csv(csv.as_ptr(), ptr::null(), ptr::null_mut()) };
        assert_eq!(rc, COMPARE_ERR_NULL_PTR);
    }

    #[test]
    fn ffi_first_null_argument_is_reported() {
        let csv = CString::new("a,b\n1,2\n").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe {
            compare_columns_csv(csv.as_ptr(), ptr::null(), ptr::null(), ptr::null(), &mut out)
        };
        assert_eq!(rc, COMPARE_ERR_NULL_PTR);
        assert_eq!(last_error(), "null group_col pointer");
    }

    #[test]
    fn ffi_empty_table_is_parse_failure() {
        let csv = CString::new("a,b\n").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_analyze_csv(csv.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_ERR_PARSE_FAILED);
    }

    #[test]
    fn ffi_compare_empty_table_is_parse_failure() {
        let csv = CString::new("a,b\n").unwrap();
        let a = CString::new("a").unwrap();
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { compare_columns_csv(csv.as_ptr(), a.as_ptr(), a.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(rc, COMPARE_ERR_PARSE_FAILED);
    }

    #[test]
    fn ffi_free_null_is_noop() {
        unsafe { compare_string_free(ptr::null_mut()) };
    }
}
