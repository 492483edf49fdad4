use object::Value;

use crate::{LispResult, Runtime};

/// Hand a call that no cached method matched to the dispatch-miss function.
///
/// The function is looked up by name on every miss, so redefining it takes
/// effect for dispatchers that already exist. The vaslist is passed on
/// unchanged; the callee computes the effective method, usually installs a
/// new dispatcher and returns the values of the call.
pub fn dispatch_miss(runtime: &Runtime, generic_function: Value, vaslist: Value) -> LispResult {
    let symbol = runtime.settings().dispatch_miss_symbol();
    log::debug!("dispatch miss in {generic_function:?}, calling {symbol}");
    runtime
        .symbols()
        .funcall(symbol, &[generic_function, vaslist])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vaslist::{CallFrame, Vaslist, rewind_vaslist};
    use crate::{Condition, DispatchCreateInfo, MultipleValues};
    use object::{Heap, Stamp};

    #[test]
    fn miss_calls_handler_with_gf_and_arguments() {
        let runtime = Runtime::default();
        runtime.symbols().register(
            "CLOS:DISPATCH-MISS",
            |args: &[Value]| -> LispResult {
                let vaslist = unsafe { Vaslist::from_value(args[1]) };
                let mut values = vec![args[0]];
                values.extend(vaslist.to_vec());
                Ok(MultipleValues::new(values))
            },
        );

        let mut heap = Heap::new();
        let gf = heap.allocate_funcallable_instance(Stamp::next_class_stamp(), 0, Value::nil());
        let args = [Value::from_fixnum(1), Value::from_char('b')];
        let frame = CallFrame::new(gf.value(), &args);
        let mut vaslist = Vaslist::new();
        let tagged = unsafe { rewind_vaslist(&mut vaslist, &frame.va_args(), frame.register_save_area()) };

        let values = dispatch_miss(&runtime, gf.value(), tagged).unwrap();
        assert_eq!(values.as_slice(), &[gf.value(), args[0], args[1]]);
    }

    #[test]
    fn redefinition_is_seen_by_the_next_miss() {
        let runtime = Runtime::default();
        runtime.symbols().register("CLOS:DISPATCH-MISS", |_: &[Value]| -> LispResult {
            Ok(MultipleValues::single(Value::from_fixnum(1)))
        });
        let first = dispatch_miss(&runtime, Value::nil(), Value::nil()).unwrap();
        assert_eq!(first.primary(), Value::from_fixnum(1));

        runtime.symbols().register("CLOS:DISPATCH-MISS", |_: &[Value]| -> LispResult {
            Ok(MultipleValues::single(Value::from_fixnum(2)))
        });
        let second = dispatch_miss(&runtime, Value::nil(), Value::nil()).unwrap();
        assert_eq!(second.primary(), Value::from_fixnum(2));
    }

    #[test]
    fn handler_conditions_pass_through() {
        let runtime = Runtime::new(DispatchCreateInfo {
            dispatch_miss_symbol: Some("TEST:MISS".into()),
            ..Default::default()
        })
        .unwrap();
        let gf = Value::from_fixnum(99);
        assert_eq!(
            dispatch_miss(&runtime, gf, Value::nil()),
            Err(Condition::UndefinedFunction {
                name: "TEST:MISS".into()
            })
        );

        runtime.symbols().register("TEST:MISS", |args: &[Value]| -> LispResult {
            Err(Condition::NoApplicableMethod {
                generic_function: args[0],
            })
        });
        assert_eq!(
            dispatch_miss(&runtime, gf, Value::nil()),
            Err(Condition::NoApplicableMethod {
                generic_function: gf
            })
        );
    }
}
