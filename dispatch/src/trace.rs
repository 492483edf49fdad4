use object::Value;

use crate::TraceMask;
use crate::vaslist::{VaArgs, Vaslist};

/// Log target of the generated-code trace.
pub const TRACE_TARGET: &str = "dispatch::trace";

/// Messages emitted by instrumented dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TraceOp {
    Step = 0,
    Integer = 1,
    Tag = 2,
    Vaslist = 3,
    Pointer = 4,
    VaList = 5,
    Stamp = 6,
    Function = 7,
}

impl TryFrom<i32> for TraceOp {
    type Error = i32;

    fn try_from(op: i32) -> Result<Self, i32> {
        Ok(match op {
            0 => Self::Step,
            1 => Self::Integer,
            2 => Self::Tag,
            3 => Self::Vaslist,
            4 => Self::Pointer,
            5 => Self::VaList,
            6 => Self::Stamp,
            7 => Self::Function,
            _ => return Err(op),
        })
    }
}

impl TraceOp {
    pub fn mask(self) -> TraceMask {
        match self {
            Self::Step => TraceMask::STEP,
            Self::Integer => TraceMask::INTEGER,
            Self::Tag => TraceMask::TAG,
            Self::Vaslist => TraceMask::VASLIST,
            Self::Pointer => TraceMask::POINTER,
            Self::VaList => TraceMask::VA_LIST,
            Self::Stamp => TraceMask::STAMP,
            Self::Function => TraceMask::FUNCTION,
        }
    }
}

/// Render one trace message, `None` when `mask` filters it out.
///
/// # Safety
///
/// For [`TraceOp::Vaslist`] the payload must be a tagged live vaslist, for
/// [`TraceOp::VaList`] a pointer to a live [`VaArgs`]. Either may be zero.
pub unsafe fn render(mask: TraceMask, op: TraceOp, payload: usize) -> Option<String> {
    if !mask.contains(op.mask()) {
        return None;
    }
    Some(match op {
        TraceOp::Step => format!("step {payload}"),
        TraceOp::Integer => format!("arg val[{}]", payload as isize),
        TraceOp::Tag => format!("tag = {payload}"),
        TraceOp::Vaslist => {
            let value = Value::from_raw(payload as u64);
            if value.untag::<Vaslist>().is_null() {
                format!("vaslist {value:?}")
            } else {
                // SAFETY: guaranteed by caller
                unsafe { Vaslist::from_value(value) }.dump()
            }
        }
        TraceOp::Pointer => format!("ptr: {:#x}", payload),
        TraceOp::VaList => {
            let va_args = payload as *const VaArgs;
            if va_args.is_null() {
                "va_list: null".to_owned()
            } else {
                // SAFETY: guaranteed by caller
                unsafe { &*va_args }.dump()
            }
        }
        TraceOp::Stamp => format!("argument stamp: {payload}"),
        TraceOp::Function => format!("dispatch to: {:#x}", payload),
    })
}

/// Log a trace message from generated code. Unknown opcodes are ignored.
///
/// # Safety
///
/// See [`render`].
pub unsafe fn dispatch_debug(mask: TraceMask, op: i32, payload: usize) {
    let Ok(op) = TraceOp::try_from(op) else {
        log::debug!(target: TRACE_TARGET, "ignoring unknown trace opcode {op}");
        return;
    };
    // SAFETY: guaranteed by caller
    if let Some(message) = unsafe { render(mask, op, payload) } {
        log::debug!(target: TRACE_TARGET, "{message}");
    }
}
