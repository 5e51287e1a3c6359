//! Recovery store infrastructure module

mod fs_store;

pub use fs_store::FsRecoveryStore;
