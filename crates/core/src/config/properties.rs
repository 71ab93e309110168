use crate::constants::{GLOBAL_PROPERTIES_FILE, PROPERTIES_FILE, USER_HOME_ENV};
use crate::error::Result;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static SENSITIVE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password|passwd|pwd|secret|token|credential|api[._-]?key)")
        .expect("sensitive key pattern is valid")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

const MAX_INTERPOLATION_DEPTH: usize = 16;

/// Returns true when values of this key must not be displayed.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

#[derive(Debug, Clone)]
struct Layer {
    name: String,
    values: BTreeMap<String, String>,
}

/// Layered key/value store. Layers are consulted in order, the first one
/// holding a key wins.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    layers: Vec<Layer>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer with lower precedence than the existing ones.
    pub fn with_layer(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.layers.push(Layer {
            name: name.into(),
            values: values.into_iter().collect(),
        });
        self
    }

    /// Builds the store of a project: system properties, then environment,
    /// then the global file, then the project file and the files of the
    /// parent directories holding one.
    pub fn load(
        base_dir: &Path,
        system: &BTreeMap<String, String>,
        env: &BTreeMap<String, String>,
        global_file: Option<&Path>,
    ) -> Result<Self> {
        let mut props = Properties::new()
            .with_layer("system properties", system.clone())
            .with_layer("environment", normalize_env(env));

        if let Some(global) = global_file.filter(|path| path.is_file()) {
            debug!("Loading global properties from {}", global.display());
            props = props.with_layer(
                global.display().to_string(),
                read_properties_file(global)?,
            );
        }

        for file in local_property_files(base_dir) {
            debug!("Loading project properties from {}", file.display());
            let values = read_properties_file(&file)?;
            props = props.with_layer(file.display().to_string(), values);
        }
        Ok(props)
    }

    /// Raw value, without placeholder substitution.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.layers
            .iter()
            .find_map(|layer| layer.values.get(key))
            .map(String::as_str)
    }

    /// Value with `${name}` placeholders substituted. Unknown placeholders are
    /// left verbatim.
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = self.get_raw(key)?;
        let mut visiting = HashSet::from([key.to_string()]);
        Some(self.interpolate(raw, &mut visiting, 0))
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Name of the layer the value of `key` comes from.
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.layers
            .iter()
            .find(|layer| layer.values.contains_key(key))
            .map(|layer| layer.name.as_str())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .layers
            .iter()
            .flat_map(|layer| layer.values.keys().map(String::as_str))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Interpolated values of every key starting with `prefix`.
    pub fn get_all_starting_with(&self, prefix: &str, keep_prefix: bool) -> BTreeMap<String, String> {
        self.keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter_map(|key| {
                let value = self.get(key)?;
                let name = if keep_prefix {
                    key.to_string()
                } else {
                    key[prefix.len()..].to_string()
                };
                Some((name, value))
            })
            .collect()
    }

    fn interpolate(&self, raw: &str, visiting: &mut HashSet<String>, depth: usize) -> String {
        if depth >= MAX_INTERPOLATION_DEPTH || !raw.contains("${") {
            return raw.to_string();
        }
        PLACEHOLDER
            .replace_all(raw, |caps: &regex::Captures| {
                let name = &caps[1];
                match self.get_raw(name) {
                    Some(value) if !visiting.contains(name) => {
                        visiting.insert(name.to_string());
                        let resolved = self.interpolate(value, visiting, depth + 1);
                        visiting.remove(name);
                        resolved
                    }
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Environment variables are visible both as-is and under their property
/// form: `JEKA_DEFAULT_KBEAN` also answers `jeka.default.kbean`.
fn normalize_env(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut result = env.clone();
    for (key, value) in env {
        let normalized = key.to_lowercase().replace('_', ".");
        result.entry(normalized).or_insert_with(|| value.clone());
    }
    result
}

/// Project property files, the project one first: the parent directory file
/// is read only while the parent holds one.
pub fn local_property_files(base_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let first = base_dir.join(PROPERTIES_FILE);
    if first.is_file() {
        files.push(first);
    }
    let mut current = base_dir.parent();
    while let Some(dir) = current {
        let candidate = dir.join(PROPERTIES_FILE);
        if !candidate.is_file() {
            break;
        }
        files.push(candidate);
        current = dir.parent();
    }
    files
}

/// Location of the user-global properties file.
pub fn global_properties_file(env: &BTreeMap<String, String>) -> Option<PathBuf> {
    if let Some(home) = env.get(USER_HOME_ENV) {
        return Some(PathBuf::from(home).join(GLOBAL_PROPERTIES_FILE));
    }
    env.get("HOME")
        .or_else(|| env.get("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".jeka").join(GLOBAL_PROPERTIES_FILE))
}

pub fn read_properties_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_properties(&text))
}

/// Parses `.properties` text: `#`/`!` comments, `=`, `:` or whitespace
/// separators, trailing backslash continuation.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    let mut pending = String::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if pending.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!')) {
            continue;
        }
        if let Some(stripped) = trimmed.strip_suffix('\\').filter(|s| !s.ends_with('\\')) {
            pending.push_str(stripped);
            continue;
        }
        pending.push_str(trimmed);
        let logical = std::mem::take(&mut pending);
        if let Some((key, value)) = split_entry(&logical) {
            result.insert(key, value);
        }
    }
    if !pending.is_empty() {
        if let Some((key, value)) = split_entry(&pending) {
            result.insert(key, value);
        }
    }
    result
}

/// Key ends at the first unescaped `=`, `:` or whitespace. A line holding
/// only a key maps it to the empty string.
fn split_entry(line: &str) -> Option<(String, String)> {
    let mut key_end = line.len();
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            key_end = index;
            break;
        }
    }
    let key = unescape(&line[..key_end]);
    if key.is_empty() {
        return None;
    }
    let rest = line[key_end..].trim_start();
    let rest = rest
        .strip_prefix(['=', ':'])
        .map(str::trim_start)
        .unwrap_or(rest);
    Some((key, unescape(rest)))
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}
