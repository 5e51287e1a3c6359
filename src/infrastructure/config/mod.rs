//! Configuration infrastructure module

mod xdg;

pub use xdg::{default_config_path, default_recovery_dir, recovery_dir, XdgConfigStore};
