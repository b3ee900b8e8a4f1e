//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names. Cookbooks are passed as UTF-8 JSON (not
//! necessarily null-terminated) with an explicit length.
//!
//! ## Memory management
//! - Buffers and strings returned by `cbf_*` functions are allocated on the
//!   Rust heap.
//! - Callers **must** free them with `cbf_free_buffer` / `cbf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`: `0` success, `1` null pointer,
//!   `2` invalid UTF-8, `3` invalid cookbook JSON, `4` rendering failure,
//!   `5` output contained an interior NUL.
//! - Error details can be retrieved via `cbf_last_error`.
//!
//! ## Thread safety
//! - `cbf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lcookbook_forge
//! // #include "cookbook_forge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;
use std::slice;
use std::time::Duration;

use crate::compose::compose_html;
use crate::engine::{engine_by_name, DraftEngine, RenderEngine, RenderOptions};
use crate::model::Cookbook;
use crate::pipeline::generate_pdf;
use crate::style::{Margins, PageFormat};
use crate::toc::estimate_toc;

const ERR_NULL: c_int = 1;
const ERR_UTF8: c_int = 2;
const ERR_JSON: c_int = 3;
const ERR_RENDER: c_int = 4;
const ERR_NUL: c_int = 5;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// Rendering engine selector for [`CbfRenderConfig`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbfEngine {
    /// In-process approximate renderer (default).
    Draft = 0,
    /// Headless Chrome/Chromium.
    Chrome = 1,
}

/// Optional rendering configuration passed to `cbf_generate_pdf_ex`.
///
/// Fields set to `0` (or `NULL`) fall back to their defaults:
/// - `page_width_mm` / `page_height_mm` → A4 (210 × 297)
/// - `margin_mm` → 0 (page blocks carry their own 18 mm margin)
/// - `timeout_secs` → 60
/// - `chrome_path` → discovered from `CHROME_PATH` / `PATH`
#[repr(C)]
pub struct CbfRenderConfig {
    pub engine: CbfEngine,
    /// Null-terminated UTF-8 path to a Chrome binary, or `NULL`.
    pub chrome_path: *const c_char,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub timeout_secs: u32,
}

fn render_options_from_c(cfg: &CbfRenderConfig) -> RenderOptions {
    let defaults = RenderOptions::default();
    let or_default = |v: f32, d: f32| if v > 0.0 { v } else { d };
    RenderOptions {
        format: PageFormat {
            width_mm: or_default(cfg.page_width_mm, defaults.format.width_mm),
            height_mm: or_default(cfg.page_height_mm, defaults.format.height_mm),
        },
        margins: if cfg.margin_mm > 0.0 {
            Margins::uniform(cfg.margin_mm)
        } else {
            defaults.margins
        },
        timeout: if cfg.timeout_secs > 0 {
            Duration::from_secs(u64::from(cfg.timeout_secs))
        } else {
            defaults.timeout
        },
        ..defaults
    }
}

/// # Safety
/// `cfg.chrome_path`, if non-null, must point to a valid null-terminated
/// string.
unsafe fn engine_from_c(cfg: &CbfRenderConfig) -> Result<Box<dyn RenderEngine>, String> {
    match cfg.engine {
        CbfEngine::Draft => Ok(Box::new(DraftEngine::discover(None).map_err(|e| e.to_string())?)),
        CbfEngine::Chrome => {
            let path = if cfg.chrome_path.is_null() {
                None
            } else {
                let s = CStr::from_ptr(cfg.chrome_path)
                    .to_str()
                    .map_err(|e| format!("Invalid UTF-8 in chrome_path: {e}"))?;
                Some(PathBuf::from(s))
            };
            engine_by_name("chrome", path).map_err(|e| e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// # Safety
/// `ptr` must point to `len` valid bytes.
unsafe fn read_cookbook(ptr: *const u8, len: u32) -> Result<Cookbook, (c_int, String)> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    let json = std::str::from_utf8(bytes).map_err(|e| (ERR_UTF8, format!("Invalid UTF-8: {e}")))?;
    Cookbook::from_json(json).map_err(|e| (ERR_JSON, format!("Invalid cookbook JSON: {e}")))
}

/// # Safety
/// `out` must be a valid pointer.
unsafe fn write_string(s: String, out: *mut *mut c_char) -> c_int {
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(_) => {
            *out = ptr::null_mut();
            set_last_error("Output contained a null byte");
            ERR_NUL
        }
    }
}

/// # Safety
/// `out_buf` and `out_len` must be valid pointers.
unsafe fn write_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Compose a cookbook into its printable HTML document.
///
/// # Parameters
/// - `json_ptr`, `json_len`: UTF-8 cookbook JSON
/// - `out_html`: receives a null-terminated HTML string (free with
///   `cbf_free_string`)
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_html` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn cbf_compose_html(
    json_ptr: *const u8,
    json_len: u32,
    out_html: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_html.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    match read_cookbook(json_ptr, json_len) {
        Ok(cookbook) => write_string(compose_html(&cookbook), out_html),
        Err((code, msg)) => {
            set_last_error(&msg);
            code
        }
    }
}

/// Estimate the table of contents. Returns a JSON array of
/// `{"title", "page_number"}` objects.
///
/// # Safety
/// Same as `cbf_compose_html`.
#[no_mangle]
pub unsafe extern "C" fn cbf_estimate_toc(
    json_ptr: *const u8,
    json_len: u32,
    out_json: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let cookbook = match read_cookbook(json_ptr, json_len) {
        Ok(c) => c,
        Err((code, msg)) => {
            set_last_error(&msg);
            return code;
        }
    };
    let toc = estimate_toc(&cookbook.recipes, cookbook.toc_style());
    match serde_json::to_string(&toc) {
        Ok(json) => write_string(json, out_json),
        Err(e) => {
            set_last_error(&format!("Serialising TOC: {e}"));
            ERR_JSON
        }
    }
}

/// Compose and render a cookbook to PDF with the draft engine.
///
/// # Parameters
/// - `json_ptr`, `json_len`: UTF-8 cookbook JSON
/// - `out_buf`, `out_len`: on success, the PDF bytes (free with
///   `cbf_free_buffer`)
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn cbf_generate_pdf(
    json_ptr: *const u8,
    json_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    cbf_generate_pdf_ex(json_ptr, json_len, ptr::null(), out_buf, out_len)
}

/// Compose and render with a custom [`CbfRenderConfig`]; pass `NULL` for
/// defaults.
///
/// # Safety
/// - Same as `cbf_generate_pdf`.
/// - `cfg`, if non-null, must point to a fully-initialised
///   [`CbfRenderConfig`] whose `chrome_path` (if non-null) is a valid
///   null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn cbf_generate_pdf_ex(
    json_ptr: *const u8,
    json_len: u32,
    cfg: *const CbfRenderConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }
    let cookbook = match read_cookbook(json_ptr, json_len) {
        Ok(c) => c,
        Err((code, msg)) => {
            set_last_error(&msg);
            return code;
        }
    };

    let (engine, options) = if cfg.is_null() {
        (Box::new(DraftEngine::new()) as Box<dyn RenderEngine>, RenderOptions::default())
    } else {
        let cfg = &*cfg;
        match engine_from_c(cfg) {
            Ok(engine) => (engine, render_options_from_c(cfg)),
            Err(msg) => {
                set_last_error(&msg);
                return ERR_RENDER;
            }
        }
    };

    match generate_pdf(&cookbook, engine.as_ref(), &options) {
        Ok((pdf_bytes, _)) => {
            write_buffer(pdf_bytes, out_buf, out_len);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_RENDER
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `cbf_generate_pdf` / `cbf_generate_pdf_ex`.
///
/// # Safety
/// `buf` must have been returned by one of those calls, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn cbf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by `cbf_compose_html` or `cbf_estimate_toc`.
///
/// # Safety
/// `s` must have been returned by one of those calls.
#[no_mangle]
pub unsafe extern "C" fn cbf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message on this thread, or null if none.
///
/// The returned pointer is valid until the next failing `cbf_*` call on the
/// same thread. The caller must **not** free it.
#[no_mangle]
pub extern "C" fn cbf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn cbf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
