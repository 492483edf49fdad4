use clap::Parser;

use dispatch::abi;
use dispatch::vaslist::{CallFrame, Vaslist};
use dispatch::{Condition, DispatchCreateInfo, LispResult, MultipleValues, Runtime};
use object::{Heap, Stamp, Value};

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive the dispatch entry points against a small heap", long_about = None)]
struct Cli {
    /// Log level, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<log::LevelFilter>,

    /// Name of the dispatch-miss function
    #[arg(long)]
    dispatch_miss_symbol: Option<String>,

    /// Maximum number of values a call may return
    #[arg(long)]
    values_limit: Option<usize>,

    /// Fixnum arguments of the generic function call
    #[arg(allow_negative_numbers = true)]
    args: Vec<i64>,
}

/// Stand-in for the dispatch-miss function: returns the sum of the
/// arguments and their count.
fn sum_arguments(args: &[Value]) -> LispResult {
    // SAFETY: the caller passes the vaslist it just rewound
    let vaslist = unsafe { Vaslist::from_value(args[1]) };
    let mut sum = 0i64;
    let mut count = 0i64;
    while let Some(arg) = vaslist.next_arg() {
        let Some(n) = arg.as_fixnum() else {
            return Err(Condition::NoApplicableMethod {
                generic_function: args[0],
            });
        };
        sum = sum.wrapping_add(n);
        count += 1;
    }
    Ok(MultipleValues::new(vec![
        Value::from_fixnum(sum.clamp(Value::FIXNUM_MIN, Value::FIXNUM_MAX)),
        Value::from_fixnum(count),
    ]))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if let Some(level) = cli.log_level {
        logger.filter_level(level);
    }
    logger.init();

    if let Some(n) = cli
        .args
        .iter()
        .find(|n| !(Value::FIXNUM_MIN..=Value::FIXNUM_MAX).contains(*n))
    {
        return Err(format!("{n} is not a fixnum").into());
    }

    let runtime = Runtime::install(DispatchCreateInfo {
        dispatch_miss_symbol: cli.dispatch_miss_symbol,
        multiple_values_limit: cli.values_limit,
        ..Default::default()
    })?;
    let settings = runtime.settings();
    runtime
        .symbols()
        .register(settings.dispatch_miss_symbol(), sum_arguments);
    runtime.symbols().register(
        settings.slot_unbound_symbol(),
        |_: &[Value]| -> LispResult { Ok(MultipleValues::single(Value::from_fixnum(0))) },
    );

    let mut heap = Heap::new();

    // a generic function call that misses
    let gf = heap.allocate_funcallable_instance(Stamp::next_class_stamp(), 0, Value::nil());
    let args: Vec<Value> = cli.args.iter().map(|&n| Value::from_fixnum(n)).collect();
    let frame = CallFrame::new(gf.value(), &args);
    let va_args = frame.va_args();
    let mut vaslist = Vaslist::new();
    // SAFETY: the frame outlives every use of the vaslist below
    let tagged = unsafe {
        let tagged = abi::cc_rewind_vaslist(&mut vaslist, &va_args, frame.register_save_area());
        abi::cc_dispatch_debug(3, tagged.raw() as usize);
        tagged
    };
    let ret = abi::cc_dispatch_miss(gf.value(), tagged);
    // SAFETY: as above
    unsafe { abi::cc_vaslist_end(tagged) };
    let values = ret.into_values();
    log::info!("dispatch miss returned {:?}", values.as_slice());

    // slot readers on an instance with one bound and one unbound slot
    let point = heap.allocate_instance(Stamp::INSTANCE, Stamp::next_class_stamp(), 2);
    let x = heap.allocate_optimized_slot_info(Value::from_fixnum(1), Value::from_char('x'));
    let y = heap.allocate_optimized_slot_info(Value::from_fixnum(2), Value::from_char('y'));
    // SAFETY: all objects are live in `heap`
    unsafe {
        abi::cc_dispatch_slot_writer_index(Value::from_fixnum(3), 1, point.value());
        let raw_x = abi::cc_dispatch_slot_reader_index(1, point.value());
        let raw_y = abi::cc_dispatch_slot_reader_index(2, point.value());
        log::info!(
            "point x = {:?}, y = {:?}",
            abi::cc_bound_or_error(x.value(), point.value(), raw_x),
            abi::cc_bound_or_error(y.value(), point.value(), raw_y)
        );
        log::info!("point stamp {}", abi::cc_read_stamp(point.value()));
        abi::cc_dispatch_debug(6, abi::cc_read_stamp(point.value()) as usize);
    }

    println!("{}", values.primary().as_fixnum().unwrap_or_default());
    Ok(())
}
