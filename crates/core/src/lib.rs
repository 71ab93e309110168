//! jeka-runner-core - KBean resolution and command execution engine
//!
//! This crate provides functionality to:
//! - Parse command lines and `jeka.properties` into KBean actions
//! - Resolve and compile the `jeka-src` classpath of a project and its imports
//! - Discover KBean classes, instantiate them and invoke their methods
pub mod action;
pub mod bean;
pub mod builtins;
pub mod cache;
pub mod cmdline;
pub mod compile;
pub mod config;
pub mod constants;
pub mod deps;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod runbase;

// Re-export commonly used types and traits
pub use error::{Error, Result, ResultExt};

// Re-export main API components
pub use action::{ActionContainer, ActionKind, ActionSource, KBeanAction};
pub use bean::{BeanCatalog, BeanContext, BeanHandle, KBean, KBeanDescriptor};
pub use config::{Properties, Settings, Verbosity};
pub use deps::{DependencyResolver, PathSequence};
pub use runbase::{ExecutionReport, Runbase, RunbaseReport, RunbaseState, Workspace};
