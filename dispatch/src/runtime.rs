use std::sync::OnceLock;

use crate::{DispatchCreateInfo, DispatchSettings, SettingsError, SymbolTable};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Settings and symbol bindings shared by every dispatch entry point.
#[derive(Debug, Default)]
pub struct Runtime {
    settings: DispatchSettings,
    symbols: SymbolTable,
}

impl Runtime {
    pub fn new(info: DispatchCreateInfo) -> Result<Self, SettingsError> {
        Ok(Self {
            settings: DispatchSettings::new(info)?,
            symbols: SymbolTable::new(),
        })
    }

    /// Install the process-wide runtime used by the `cc_*` entry points.
    pub fn install(info: DispatchCreateInfo) -> Result<&'static Runtime, SettingsError> {
        let runtime = Self::new(info)?;
        let mut installed = false;
        let global = RUNTIME.get_or_init(|| {
            installed = true;
            runtime
        });
        if !installed {
            return Err(SettingsError::AlreadyInstalled);
        }
        log::debug!("installed dispatch runtime {:?}", global.settings);
        Ok(global)
    }

    /// The installed runtime, installing defaults on first use.
    pub fn global() -> &'static Runtime {
        RUNTIME.get_or_init(Runtime::default)
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
