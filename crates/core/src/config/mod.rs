//! Configuration: layered properties and command-line settings.

pub mod properties;
pub mod settings;

pub use properties::{Properties, global_properties_file, is_sensitive_key, parse_properties};
pub use settings::{Settings, Verbosity};
