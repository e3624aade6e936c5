//! Paths and file modes as git records them in trees and in the index.

mod file_mode;
pub use file_mode::FileMode;

mod git_path;
pub use git_path::{check_name, check_path, GitPathError};

mod path_mode;
pub use path_mode::{tree_order, PathMode};
