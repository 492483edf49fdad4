use std::fmt;

use object::Value;

/// A recoverable Lisp-level error raised on the dispatch paths.
///
/// Rust callers see these through `Result`; native callers of the `cc_*`
/// entry points see them as an unwinding panic whose payload is the
/// condition itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    UnboundSlot { instance: Value, slot_name: Value },
    UndefinedFunction { name: String },
    NoApplicableMethod { generic_function: Value },
    TooManyValues { count: usize, limit: usize },
    Signaled { message: String },
}

impl Condition {
    pub fn signaled(message: impl Into<String>) -> Self {
        Self::Signaled {
            message: message.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundSlot {
                instance,
                slot_name,
            } => {
                write!(f, "the slot {slot_name:?} is unbound in {instance:?}")
            }
            Self::UndefinedFunction { name } => {
                write!(f, "the function {name} is undefined")
            }
            Self::NoApplicableMethod { generic_function } => {
                write!(f, "no applicable method for {generic_function:?}")
            }
            Self::TooManyValues { count, limit } => {
                write!(f, "{count} values exceed the limit of {limit}")
            }
            Self::Signaled { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Condition {}
