//! Dependency descriptors, classpaths and the resolver collaborator.

pub mod dependency;
pub mod path_sequence;
pub mod resolver;

pub use dependency::{Coordinate, Dependency, DependencySet};
pub use path_sequence::PathSequence;
pub use resolver::{DependencyResolver, LocalRepoResolver};
