pub mod help;
pub mod run;

pub use help::help_command;
pub use run::run_command;
