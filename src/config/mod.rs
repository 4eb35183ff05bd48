// Re-export all items from the submodules
mod env_vars;
mod shipper_config;

pub use shipper_config::{
    DestinationConfig,
    ShipperConfig,
    SourceConfig,
    SourceKind,
    TransferSettings,
    load_config,
};

pub use env_vars::parse_unix_env_vars;
