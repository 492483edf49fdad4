use std::fmt::Write as _;
use std::ptr;

use object::{Value, hard_error};

/// Arguments passed in registers by the calling convention.
pub const ARGS_IN_REGISTERS: usize = 4;

pub const CLOSURE_INDEX: usize = 0;
pub const NARGS_INDEX: usize = 1;
pub const FIRST_ARG_INDEX: usize = 2;

/// The words a variadic callee spills from its argument registers.
///
/// ```text
/// [0] closure  [1] nargs  [2..2+ARGS_IN_REGISTERS] register arguments
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RegisterSaveArea {
    words: [u64; FIRST_ARG_INDEX + ARGS_IN_REGISTERS],
}

impl RegisterSaveArea {
    /// Spill `closure` and the first register arguments of `args`; the
    /// count covers all of `args`, including the ones left on the stack.
    pub fn new(closure: Value, args: &[Value]) -> Self {
        let mut words = [Value::nil().raw(); FIRST_ARG_INDEX + ARGS_IN_REGISTERS];
        words[CLOSURE_INDEX] = closure.raw();
        words[NARGS_INDEX] = args.len() as u64;
        for (word, arg) in words[FIRST_ARG_INDEX..].iter_mut().zip(args) {
            *word = arg.raw();
        }
        Self { words }
    }

    pub fn closure(&self) -> Value {
        Value::from_raw(self.words[CLOSURE_INDEX])
    }

    pub fn nargs(&self) -> usize {
        self.words[NARGS_INDEX] as usize
    }

    pub fn register_arg(&self, index: usize) -> Value {
        Value::from_raw(self.words[FIRST_ARG_INDEX + index])
    }
}

/// A cursor over variadic arguments: register arguments from a save area,
/// then stack arguments from an overflow area.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VaArgs {
    reg_save_area: *const RegisterSaveArea,
    next_register: usize,
    overflow_start: *const Value,
    overflow_next: *const Value,
    valid: bool,
}

impl VaArgs {
    /// A cursor positioned at the first argument.
    pub fn new(reg_save_area: *const RegisterSaveArea, overflow: *const Value) -> Self {
        Self {
            reg_save_area,
            next_register: 0,
            overflow_start: overflow,
            overflow_next: overflow,
            valid: true,
        }
    }

    /// A cursor that must be filled by [`rewind_vaslist`] before use.
    pub const fn invalid() -> Self {
        Self {
            reg_save_area: ptr::null(),
            next_register: 0,
            overflow_start: ptr::null(),
            overflow_next: ptr::null(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Restart at the first register argument of `reg_save_area`.
    pub fn rewind(&mut self, reg_save_area: *const RegisterSaveArea) {
        self.reg_save_area = reg_save_area;
        self.next_register = 0;
        self.overflow_next = self.overflow_start;
    }

    /// Consume the next argument.
    ///
    /// # Safety
    ///
    /// The save area and overflow area must be live, and an argument must
    /// remain.
    pub unsafe fn next_arg(&mut self) -> Value {
        if !self.valid {
            hard_error!("va_list read after it was ended");
        }
        if self.next_register < ARGS_IN_REGISTERS {
            // SAFETY: guaranteed by caller
            let area = unsafe { &*self.reg_save_area };
            let arg = area.register_arg(self.next_register);
            self.next_register += 1;
            arg
        } else {
            // SAFETY: guaranteed by caller
            unsafe {
                let arg = *self.overflow_next;
                self.overflow_next = self.overflow_next.add(1);
                arg
            }
        }
    }

    /// Invalidate the cursor.
    pub fn end(&mut self) {
        self.valid = false;
    }

    pub fn dump(&self) -> String {
        format!(
            "va_list reg_save_area={:p} register={} overflow={:p} valid={}",
            self.reg_save_area, self.next_register, self.overflow_next, self.valid
        )
    }
}

/// Variadic arguments forwarded as a first-class value.
///
/// The record lives in the frame of the function that received the
/// arguments; tagged with the vaslist tag it can be passed to Lisp code
/// that walks the arguments without copying them.
#[repr(C)]
#[derive(Debug)]
pub struct Vaslist {
    args: VaArgs,
    remaining: usize,
}

const _: () = assert!(align_of::<Vaslist>() >= 8);

impl Vaslist {
    pub const fn new() -> Self {
        Self {
            args: VaArgs::invalid(),
            remaining: 0,
        }
    }

    /// # Safety
    ///
    /// `value` must be vaslist-tagged and point to a live record that is not
    /// otherwise borrowed.
    pub unsafe fn from_value<'a>(value: Value) -> &'a mut Vaslist {
        debug_assert!(value.is_vaslist(), "not a vaslist: {value:?}");
        // SAFETY: guaranteed by caller
        unsafe { &mut *value.untag::<Vaslist>() }
    }

    pub fn as_value(&self) -> Value {
        Value::from_vaslist(self as *const Vaslist)
    }

    pub fn remaining_nargs(&self) -> usize {
        self.remaining
    }

    pub fn is_ended(&self) -> bool {
        !self.args.is_valid()
    }

    /// Take the next argument, `None` once all have been consumed.
    pub fn next_arg(&mut self) -> Option<Value> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // SAFETY: a positive count is only set by rewind_vaslist, whose
        // caller vouches for the areas behind the cursor
        Some(unsafe { self.args.next_arg() })
    }

    /// Collect the remaining arguments.
    pub fn to_vec(&mut self) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.remaining);
        while let Some(arg) = self.next_arg() {
            args.push(arg);
        }
        args
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "Vaslist@{:p} remaining={} {}",
            self as *const Vaslist,
            self.remaining,
            self.args.dump()
        );
        out
    }
}

impl Default for Vaslist {
    fn default() -> Self {
        Self::new()
    }
}

/// Point `vaslist` at the arguments of the current call, from the first
/// register argument on, and return it tagged.
///
/// # Safety
///
/// `reg_save_area` and the overflow area behind `va_args` must stay live
/// for as long as the vaslist is read.
pub unsafe fn rewind_vaslist(
    vaslist: &mut Vaslist,
    va_args: &VaArgs,
    reg_save_area: *const RegisterSaveArea,
) -> Value {
    vaslist.args = *va_args;
    vaslist.args.rewind(reg_save_area);
    // SAFETY: guaranteed by caller
    vaslist.remaining = unsafe { (*reg_save_area).nargs() };
    vaslist.as_value()
}

/// Finish with the arguments. The record itself stays in its frame.
pub fn end_vaslist(vaslist: &mut Vaslist) {
    vaslist.args.end();
}

/// Owned argument storage laid out the way a variadic callee sees it.
#[derive(Debug)]
pub struct CallFrame {
    area: Box<RegisterSaveArea>,
    overflow: Box<[Value]>,
}

impl CallFrame {
    pub fn new(closure: Value, args: &[Value]) -> Self {
        let overflow = args.get(ARGS_IN_REGISTERS..).unwrap_or_default();
        Self {
            area: Box::new(RegisterSaveArea::new(closure, args)),
            overflow: overflow.into(),
        }
    }

    pub fn register_save_area(&self) -> *const RegisterSaveArea {
        &*self.area
    }

    /// A fresh cursor over the frame's arguments.
    pub fn va_args(&self) -> VaArgs {
        VaArgs::new(self.register_save_area(), self.overflow.as_ptr())
    }
}
