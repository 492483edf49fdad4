pub mod abi;
pub mod slots;
pub mod trace;
pub mod vaslist;

mod condition;
mod miss;
mod runtime;
mod settings;
mod symbols;
mod values;

pub use condition::Condition;
pub use miss::dispatch_miss;
pub use runtime::Runtime;
pub use settings::{
    DEFAULT_DISPATCH_MISS_SYMBOL, DEFAULT_MULTIPLE_VALUES_LIMIT, DEFAULT_SLOT_UNBOUND_SYMBOL,
    DispatchCreateInfo, DispatchSettings, SettingsError, TraceMask,
};
pub use symbols::{LispFunction, LispResult, SymbolTable};
pub use values::{MultipleValues, ReturnType};
