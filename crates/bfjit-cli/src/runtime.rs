//! The concrete `bf_putchar`/`bf_getchar` implementations bound into a
//! compiled program's JIT handle, grounded on `original_source`'s
//! `bfPutchar`/`bfGetchar` free functions in `bfvm.cc`: unbuffered
//! byte-at-a-time stdin/stdout, with EOF mapped to the configured
//! `eof_value` rather than a fixed constant.

use std::io::{Read, Write};
use std::os::raw::{c_int, c_void};

/// Carries the one piece of state the runtime symbols need that isn't
/// baked into the compiled code itself: what to return on EOF. Passed as
/// the opaque `context` pointer every entry point receives.
pub struct RunState {
    pub eof_value: i64,
}

/// # Safety
/// `ctx` must point to a live [`RunState`] for the duration of the call.
pub unsafe extern "C" fn bf_putchar(_ctx: *mut c_void, byte: c_int) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(&[byte as u8]);
}

/// # Safety
/// `ctx` must point to a live [`RunState`] for the duration of the call.
pub unsafe extern "C" fn bf_getchar(ctx: *mut c_void) -> c_int {
    let state = &*(ctx as *const RunState);
    let mut byte = [0u8; 1];
    match std::io::stdin().read(&mut byte) {
        Ok(1) => byte[0] as c_int,
        _ => state.eof_value as c_int,
    }
}
