//! Shared utilities across bootpack modules.

pub mod files;
pub mod temp;

pub use files::{copy_file, copy_tree, is_nonempty_file, set_mode, write_file_with_dirs};
pub use temp::{cleanup_work_dir, prepare_work_dir, WorkDir};
