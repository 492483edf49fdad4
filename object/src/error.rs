use core::fmt;

/// Stop after a broken structural invariant.
///
/// Hard errors are not conditions: nothing past the failed check can trust
/// the object graph, so the message is logged and the thread panics.
#[cold]
#[track_caller]
pub fn fatal(args: fmt::Arguments<'_>) -> ! {
    log::error!("hard error: {args}");
    panic!("{args}")
}

/// Format and raise a hard error, see [`fatal`].
#[macro_export]
macro_rules! hard_error {
    ($($arg:tt)*) => {
        $crate::error::fatal(format_args!($($arg)*))
    };
}
