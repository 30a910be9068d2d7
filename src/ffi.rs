//! C ABI over the process-wide [`crate::shared`] instance.
//!
//! Functions are `#[no_mangle] extern "C"` so a foreign front end can link
//! `libechoverse.a` behind a plain C header.
//!
//! ## Memory contract
//!
//! | Function                   | Caller frees with          |
//! |----------------------------|----------------------------|
//! | [`echoverse_rewrite`]      | [`echoverse_free_string`]  |
//! | [`echoverse_synthesize`]   | [`echoverse_free_string`]  |
//! | `*out_err` of synthesize   | [`echoverse_free_string`]  |

use std::ffi::{c_char, CStr, CString};

use crate::tone::Tone;

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Borrow a C string as UTF-8 (lossy).  `None` for null.
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Heap-allocate an owned C string.  Interior nul bytes are stripped.
fn to_c_string(s: &str) -> *mut c_char {
    let clean: String = s.chars().filter(|&c| c != '\0').collect();
    match CString::new(clean) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Rewrite `text` in `tone` ("Neutral", "Suspenseful", "Inspiring"; anything
/// else, including `NULL`, is Neutral).
///
/// @return  Heap-allocated UTF-8 text, or `NULL` if `text` is `NULL`.
///          Free with [`echoverse_free_string`].
#[no_mangle]
pub unsafe extern "C" fn echoverse_rewrite(text: *const c_char, tone: *const c_char) -> *mut c_char {
    let Some(text) = (unsafe { cstr_to_string(text) }) else {
        return std::ptr::null_mut();
    };
    let tone = unsafe { cstr_to_string(tone) }
        .map(|label| Tone::from_label(&label))
        .unwrap_or_default();
    to_c_string(&crate::rewrite(&text, tone))
}

/// Speak `text` and write the MP3 to the canonical output path.
///
/// @param voice    Voice label, e.g. "VoiceA"; `NULL` means "VoiceA".
/// @param rate     Rate factor, clamped to [0.6, 1.6].
/// @param out_err  Optional; on failure receives a heap-allocated message.
/// @return         Heap-allocated output path, or `NULL` on failure.
#[no_mangle]
pub unsafe extern "C" fn echoverse_synthesize(
    text: *const c_char,
    voice: *const c_char,
    rate: f32,
    out_err: *mut *mut c_char,
) -> *mut c_char {
    let fail = |msg: &str| {
        if !out_err.is_null() {
            unsafe { *out_err = to_c_string(msg) };
        }
        std::ptr::null_mut()
    };

    let Some(text) = (unsafe { cstr_to_string(text) }) else {
        return fail("null text");
    };
    let voice = unsafe { cstr_to_string(voice) }.unwrap_or_else(|| "VoiceA".to_string());

    match crate::synthesize(&text, &voice, rate) {
        Ok(path) => to_c_string(&path.to_string_lossy()),
        Err(e) => fail(&e.to_string()),
    }
}

/// Free a string returned by this library.  `NULL` is ignored.
#[no_mangle]
pub unsafe extern "C" fn echoverse_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}
