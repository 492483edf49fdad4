use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Which `cc_dispatch_debug` messages are logged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceMask: u8 {
        const STEP = 1 << 0;
        const INTEGER = 1 << 1;
        const TAG = 1 << 2;
        const VASLIST = 1 << 3;
        const POINTER = 1 << 4;
        const VA_LIST = 1 << 5;
        const STAMP = 1 << 6;
        const FUNCTION = 1 << 7;
    }
}

pub const DEFAULT_DISPATCH_MISS_SYMBOL: &str = "CLOS:DISPATCH-MISS";
pub const DEFAULT_SLOT_UNBOUND_SYMBOL: &str = "CLOS:SLOT-UNBOUND";
pub const DEFAULT_MULTIPLE_VALUES_LIMIT: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct DispatchCreateInfo {
    pub dispatch_miss_symbol: Option<String>,
    pub slot_unbound_symbol: Option<String>,
    pub multiple_values_limit: Option<usize>,
    pub trace: Option<TraceMask>,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    dispatch_miss_symbol: String,
    slot_unbound_symbol: String,
    multiple_values_limit: usize,
    trace: TraceMask,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            dispatch_miss_symbol: DEFAULT_DISPATCH_MISS_SYMBOL.to_owned(),
            slot_unbound_symbol: DEFAULT_SLOT_UNBOUND_SYMBOL.to_owned(),
            multiple_values_limit: DEFAULT_MULTIPLE_VALUES_LIMIT,
            trace: TraceMask::all(),
        }
    }
}

impl DispatchSettings {
    pub fn new(info: DispatchCreateInfo) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        if let Some(symbol) = info.dispatch_miss_symbol {
            if symbol.is_empty() {
                return Err(SettingsError::EmptySymbol {
                    which: "dispatch miss",
                });
            }
            settings.dispatch_miss_symbol = symbol;
        }
        if let Some(symbol) = info.slot_unbound_symbol {
            if symbol.is_empty() {
                return Err(SettingsError::EmptySymbol {
                    which: "slot unbound",
                });
            }
            settings.slot_unbound_symbol = symbol;
        }
        match info.multiple_values_limit {
            Some(0) => return Err(SettingsError::ZeroLimit),
            Some(limit) => settings.multiple_values_limit = limit,
            None => {}
        }
        info.trace.inspect(|&mask| settings.trace = mask);
        Ok(settings)
    }

    pub fn dispatch_miss_symbol(&self) -> &str {
        &self.dispatch_miss_symbol
    }

    pub fn slot_unbound_symbol(&self) -> &str {
        &self.slot_unbound_symbol
    }

    pub fn multiple_values_limit(&self) -> usize {
        self.multiple_values_limit
    }

    pub fn trace(&self) -> TraceMask {
        self.trace
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    AlreadyInstalled,
    EmptySymbol { which: &'static str },
    ZeroLimit,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "the dispatch runtime is already installed"),
            Self::EmptySymbol { which } => write!(f, "the {which} symbol name is empty"),
            Self::ZeroLimit => write!(f, "the multiple values limit must be positive"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_options() {
        let settings = DispatchSettings::new(DispatchCreateInfo::default()).unwrap();
        assert_eq!(settings.dispatch_miss_symbol(), "CLOS:DISPATCH-MISS");
        assert_eq!(settings.slot_unbound_symbol(), "CLOS:SLOT-UNBOUND");
        assert_eq!(settings.multiple_values_limit(), 64);
        assert_eq!(settings.trace(), TraceMask::all());
    }

    #[test]
    fn overrides_are_applied() {
        let settings = DispatchSettings::new(DispatchCreateInfo {
            dispatch_miss_symbol: Some("MY:MISS".into()),
            multiple_values_limit: Some(8),
            trace: Some(TraceMask::STEP | TraceMask::STAMP),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.dispatch_miss_symbol(), "MY:MISS");
        assert_eq!(settings.slot_unbound_symbol(), "CLOS:SLOT-UNBOUND");
        assert_eq!(settings.multiple_values_limit(), 8);
        assert!(!settings.trace().contains(TraceMask::TAG));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let empty = DispatchSettings::new(DispatchCreateInfo {
            slot_unbound_symbol: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(
            empty.unwrap_err(),
            SettingsError::EmptySymbol {
                which: "slot unbound"
            }
        );

        let zero = DispatchSettings::new(DispatchCreateInfo {
            multiple_values_limit: Some(0),
            ..Default::default()
        });
        assert_eq!(zero.unwrap_err(), SettingsError::ZeroLimit);
    }
}
