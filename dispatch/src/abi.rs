//! Entry points called by generated dispatch code.
//!
//! Hard errors inside the plain `extern "C"` functions abort the process.
//! The two entry points that run Lisp code are `extern "C-unwind"`: a
//! condition raised there unwinds into the caller as a panic whose payload
//! is the [`Condition`].

use object::{Value, resolve_stamp};

use crate::slots::{
    bound_or_error, read_slot_by_index, read_slot_by_indirection, write_slot_by_index,
    write_slot_by_indirection,
};
use crate::trace::dispatch_debug;
use crate::vaslist::{RegisterSaveArea, VaArgs, Vaslist, end_vaslist, rewind_vaslist};
use crate::{Condition, ReturnType, Runtime, dispatch_miss};

fn signal(condition: Condition) -> ! {
    log::debug!("signaling {condition}");
    std::panic::panic_any(condition)
}

/// # Safety
///
/// See [`resolve_stamp`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_read_stamp(tagged: Value) -> i64 {
    // SAFETY: guaranteed by caller
    unsafe { resolve_stamp(tagged) }.into()
}

#[unsafe(no_mangle)]
#[inline]
pub extern "C-unwind" fn cc_dispatch_miss(generic_function: Value, vaslist: Value) -> ReturnType {
    let runtime = Runtime::global();
    let limit = runtime.settings().multiple_values_limit();
    match dispatch_miss(runtime, generic_function, vaslist).and_then(|values| values.into_return(limit)) {
        Ok(ret) => ret,
        Err(condition) => signal(condition),
    }
}

/// # Safety
///
/// See [`read_slot_by_index`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_dispatch_slot_reader_index(index: usize, instance: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe { read_slot_by_index(index, instance) }
}

/// # Safety
///
/// See [`read_slot_by_indirection`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_dispatch_slot_reader_cons(optinfo: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe { read_slot_by_indirection(optinfo) }
}

/// # Safety
///
/// See [`write_slot_by_index`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_dispatch_slot_writer_index(
    value: Value,
    index: usize,
    instance: Value,
) -> Value {
    // SAFETY: guaranteed by caller
    unsafe { write_slot_by_index(value, index, instance) }
}

/// # Safety
///
/// See [`write_slot_by_indirection`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_dispatch_slot_writer_cons(value: Value, optinfo: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe { write_slot_by_indirection(value, optinfo) }
}

/// # Safety
///
/// See [`bound_or_error`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C-unwind" fn cc_bound_or_error(
    optinfo: Value,
    instance: Value,
    value: Value,
) -> Value {
    // SAFETY: guaranteed by caller
    match unsafe { bound_or_error(Runtime::global(), optinfo, instance, value) } {
        Ok(value) => value,
        Err(condition) => signal(condition),
    }
}

/// # Safety
///
/// `vaslist`, `va_args` and `register_save_area` must be valid, see
/// [`rewind_vaslist`].
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_rewind_vaslist(
    vaslist: *mut Vaslist,
    va_args: *const VaArgs,
    register_save_area: *const RegisterSaveArea,
) -> Value {
    // SAFETY: guaranteed by caller
    unsafe { rewind_vaslist(&mut *vaslist, &*va_args, register_save_area) }
}

/// # Safety
///
/// `vaslist` must be a tagged live vaslist.
#[unsafe(no_mangle)]
#[inline]
pub unsafe extern "C" fn cc_vaslist_end(vaslist: Value) {
    // SAFETY: guaranteed by caller
    end_vaslist(unsafe { Vaslist::from_value(vaslist) });
}

#[unsafe(no_mangle)]
#[inline]
pub extern "C" fn cc_fastgf_nil() -> Value {
    Value::nil()
}

/// # Safety
///
/// See [`crate::trace::render`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cc_dispatch_debug(msg_id: i32, val: usize) {
    let mask = Runtime::global().settings().trace();
    // SAFETY: guaranteed by caller
    unsafe { dispatch_debug(mask, msg_id, val) }
}
