//! fileclerk - collate files from a source tree into a target tree
//!
//! This library discovers files under a source directory, filters them, maps
//! each one to a location under a target directory with a collation strategy,
//! and copies or moves it there. Name collisions are resolved by renaming,
//! runs can be simulated, and source directories emptied by a move are pruned.

pub mod cli;
pub mod collate;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod filter;
pub mod fs_adapter;
pub mod logging;
pub mod organize;
pub mod output;
pub mod planner;

pub use collate::{
    AlphabeticalCollation, CollateError, Collation, Collator, DateCollation, DateProperty,
    ExtensionCollation, Roots, TimeZoneSpec,
};
pub use config::{ClerkConfig, ConfigError};
pub use descriptor::{FileDescriptor, FilenameInfo, filename_info};
pub use engine::{Operation, RelocationEngine, RelocationOptions, RelocationResult};
pub use filter::{FileFilter, FilterError, FilterSpec, Pattern};
pub use fs_adapter::{FileSystem, FsError, LocalFileSystem};
pub use organize::{
    OrganizeError, OrganizeOptions, organize, organize_by_alphabetical, organize_by_date,
    organize_by_extension, organize_with, plan_organize,
};
pub use planner::RelocationPair;

pub use cli::{Cli, run_cli};
