pub mod building;
pub mod config;
pub mod selection;
mod shared;
pub mod validation;

pub use shared::{
    parse_interval, resolve_build_config, resolve_train_fraction, ArtifactPaths, InputSource,
};
