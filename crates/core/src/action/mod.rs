//! Symbolic actions derived from the command line and from properties.

pub mod container;
pub mod model;
pub mod parser;

pub use container::ActionContainer;
pub use model::{ActionKind, ActionSource, KBeanAction};
pub use parser::ActionParser;
