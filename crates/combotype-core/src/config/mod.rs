// Combotype Config API
// TOML configuration: trigger groups, matcher policy, device filters

pub mod parser;

pub use parser::{
    ComboConfig, Config, ConfigError, DevicesConfig, GeneralConfig, GroupConfig,
    DEFAULT_DISPATCH_QUEUE,
};
