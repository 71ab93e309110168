//! KBean naming conventions.
//!
//! A bean class `org.acme.ProjectKBean` answers to `org.acme.ProjectKBean`,
//! `ProjectKBean`, `projectKBean`, `Project` and `project`.

use crate::constants::KBEAN_CLASS_SUFFIX;
use crate::error::{Error, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

const RESOLUTION_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Class name without its package or enclosing class.
pub fn simple_name(class_name: &str) -> &str {
    class_name
        .rsplit(['.', '$'])
        .next()
        .unwrap_or(class_name)
}

pub fn uncapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Short name used on the command line: simple name without the `KBean`
/// suffix, uncapitalized.
pub fn short_name(class_name: &str) -> String {
    let simple = simple_name(class_name);
    let stripped = simple
        .strip_suffix(KBEAN_CLASS_SUFFIX)
        .filter(|prefix| !prefix.is_empty())
        .unwrap_or(simple);
    uncapitalize(stripped)
}

/// True if `name` designates `class_name` under one of the accepted forms.
pub fn name_matches(class_name: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name == class_name {
        return true;
    }
    let simple = simple_name(class_name);
    let uncapitalized_simple = uncapitalize(simple);
    let uncapitalized_name = uncapitalize(name);
    if uncapitalized_name == uncapitalized_simple {
        return true;
    }
    if let Some(prefix) = simple.strip_suffix(KBEAN_CLASS_SUFFIX).filter(|p| !p.is_empty()) {
        if uncapitalize(prefix) == uncapitalized_name {
            return true;
        }
    }
    format!("{uncapitalized_name}{KBEAN_CLASS_SUFFIX}") == uncapitalized_simple
}

/// `short    (fully.qualified.Name)` lines listing candidates.
pub fn describe_candidates(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|class_name| format!("{}    ({class_name})", short_name(class_name)))
        .collect()
}

/// Maps user supplied names to one of a fixed list of class names.
pub struct NameResolver {
    candidates: Vec<String>,
    resolved: LruCache<String, Vec<String>>,
}

impl NameResolver {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            resolved: LruCache::new(RESOLUTION_CACHE_SIZE),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Every candidate matching `name`. An exact fully qualified match is
    /// returned alone.
    pub fn matches(&mut self, name: &str) -> Vec<String> {
        if let Some(cached) = self.resolved.get(name) {
            return cached.clone();
        }
        let matches: Vec<String> = match self.candidates.iter().find(|c| c.as_str() == name) {
            Some(exact) => vec![exact.clone()],
            None => {
                let mut found: Vec<String> = self
                    .candidates
                    .iter()
                    .filter(|candidate| name_matches(candidate, name))
                    .cloned()
                    .collect();
                found.dedup();
                found
            }
        };
        debug!("KBean name '{name}' matches {:?}", matches);
        self.resolved.put(name.to_string(), matches.clone());
        matches
    }

    /// The single candidate matching `name`.
    pub fn resolve(&mut self, name: &str) -> Result<String> {
        let mut matches = self.matches(name);
        match matches.len() {
            0 => Err(Error::KBeanNotFound {
                name: name.to_string(),
                available: describe_candidates(&self.candidates),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousKBean {
                name: name.to_string(),
                matches,
            }),
        }
    }

    /// Like [`resolve`](Self::resolve) but a missing bean is `None`.
    pub fn try_resolve(&mut self, name: &str) -> Result<Option<String>> {
        match self.resolve(name) {
            Ok(found) => Ok(Some(found)),
            Err(Error::KBeanNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
