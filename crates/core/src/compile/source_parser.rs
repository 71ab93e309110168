use crate::constants::JEKA_SRC_DIR;
use crate::deps::{Dependency, DependencySet};
use crate::error::{Error, Result, ResultExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use walkdir::WalkDir;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(JkDep|JkImportProject|JkCompileOption)\s*\(([^)]*)\)")
        .expect("directive pattern is valid")
});

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("string literal pattern is valid"));

/// Build directives declared in the sources of `jeka-src`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSourceInfo {
    /// Source files to compile, sorted.
    pub sources: Vec<PathBuf>,
    pub dependencies: DependencySet,
    /// Absolute directories of the projects imported with `@JkImportProject`.
    pub imported_dirs: Vec<PathBuf>,
    pub compile_options: Vec<String>,
}

impl ParsedSourceInfo {
    pub fn has_kotlin_sources(&self) -> bool {
        self.sources.iter().any(|source| is_kotlin(source))
    }

    pub fn java_sources(&self) -> Vec<PathBuf> {
        self.sources.iter().filter(|s| !is_kotlin(s)).cloned().collect()
    }
}

/// Reads `@JkDep`, `@JkImportProject` and `@JkCompileOption` string
/// arguments from the Java and Kotlin files of a project. Files whose name
/// starts with `_` are ignored.
pub struct SourceParser {
    base_dir: PathBuf,
    src_dir: PathBuf,
}

impl SourceParser {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            src_dir: base_dir.join(JEKA_SRC_DIR),
        }
    }

    pub fn source_files(&self) -> Vec<PathBuf> {
        if !self.src_dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&self.src_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| is_source(path))
            .collect()
    }

    pub fn parse(&self) -> Result<ParsedSourceInfo> {
        let mut info = ParsedSourceInfo {
            sources: self.source_files(),
            ..Default::default()
        };
        for source in &info.sources {
            let code = std::fs::read_to_string(source)
                .map_err(Error::from)
                .with_context(|| format!("Reading {}", source.display()))?;
            let code = strip_comments(&code);
            for caps in DIRECTIVE.captures_iter(&code) {
                for literal in STRING_LITERAL.captures_iter(&caps[2]) {
                    let value = literal[1].to_string();
                    match &caps[1] {
                        "JkDep" => info.dependencies.add(Dependency::parse(&value, &self.base_dir)?),
                        "JkImportProject" => {
                            let dir = self.imported_dir(&value, source)?;
                            if !info.imported_dirs.contains(&dir) {
                                info.imported_dirs.push(dir);
                            }
                        }
                        _ => info.compile_options.push(value),
                    }
                }
            }
        }
        debug!(
            "Parsed {} source files of {}: {} dependencies, {} imported projects",
            info.sources.len(),
            self.base_dir.display(),
            info.dependencies.entries().len(),
            info.imported_dirs.len()
        );
        Ok(info)
    }

    fn imported_dir(&self, relative: &str, source: &Path) -> Result<PathBuf> {
        let dir = self.base_dir.join(relative);
        dir.canonicalize().map_err(|_| {
            Error::ConfigError(format!(
                "Folder {} imported as project in {} does not exist",
                dir.display(),
                source.display()
            ))
        })
    }
}

fn is_source(path: &Path) -> bool {
    let ignored = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with('_'));
    !ignored && path.extension().is_some_and(|ext| ext == "java" || ext == "kt")
}

fn is_kotlin(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "kt")
}

/// Removes `//` and `/* */` comments, keeping string literals intact.
fn strip_comments(code: &str) -> String {
    let mut result = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = ' ';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
                result.push(' ');
            }
            _ => result.push(c),
        }
    }
    result
}
