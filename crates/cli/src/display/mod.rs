pub mod formatter;

pub use formatter::{format_actions, format_error, print_kbeans, print_options, print_runtime_info};
