//! KBean class discovery on classpaths, with a per-project cache.

pub mod class_discovery;
pub mod scanner;

pub use class_discovery::ClassDiscovery;
pub use scanner::{ClasspathScanner, DirectoryScanner, class_name_of};
