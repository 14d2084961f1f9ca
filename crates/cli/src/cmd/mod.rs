mod build;
mod clean;
mod generate;
mod info;
mod tree;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use generate::cmd_generate;
pub use info::cmd_info;
pub use tree::cmd_tree;
