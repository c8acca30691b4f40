//! Sample native library for the Vetra bridge.
//!
//! Exports follow the producer conventions of the native-code interface:
//! unmangled C linkage, and one of the supported call shapes: `f64` in and
//! out for numeric functions, C strings in and out for text functions.

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};

#[no_mangle]
pub extern "C" fn pi() -> f64 {
    std::f64::consts::PI
}

#[no_mangle]
pub extern "C" fn negate(value: f64) -> f64 {
    -value
}

#[no_mangle]
pub extern "C" fn add(a: f64, b: f64) -> f64 {
    a + b
}

#[no_mangle]
pub extern "C" fn multiply(a: f64, b: f64) -> f64 {
    a * b
}

#[no_mangle]
pub extern "C" fn clamp(value: f64, low: f64, high: f64) -> f64 {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    value.max(low).min(high)
}

#[no_mangle]
pub extern "C" fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
}

thread_local! {
    // Returned pointers stay valid until the next text call on this thread,
    // matching the static-buffer convention of classic C libraries.
    static TEXT_OUT: RefCell<CString> = RefCell::new(CString::default());
}

fn stash(text: String) -> *const c_char {
    // Interior NULs cannot occur after the replace, so `new` cannot fail.
    let out = CString::new(text.replace('\0', "")).unwrap();
    TEXT_OUT.with(|slot| {
        *slot.borrow_mut() = out;
        slot.borrow().as_ptr()
    })
}

/// # Safety
/// `input` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn reverse_text(input: *const c_char) -> *const c_char {
    if input.is_null() {
        return stash(String::new());
    }
    let text = CStr::from_ptr(input).to_string_lossy();
    stash(text.chars().rev().collect())
}

/// # Safety
/// `input` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn upper_text(input: *const c_char) -> *const c_char {
    if input.is_null() {
        return stash(String::new());
    }
    let text = CStr::from_ptr(input).to_string_lossy();
    stash(text.to_uppercase())
}
