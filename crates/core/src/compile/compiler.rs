use crate::deps::PathSequence;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Inputs of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileSpec {
    pub sources: Vec<PathBuf>,
    pub classpath: PathSequence,
    pub output_dir: PathBuf,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    /// Entries the compiled classes need at run time, such as a language
    /// runtime library.
    pub extra_classpath: PathSequence,
}

impl CompileOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            extra_classpath: PathSequence::new(),
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }
}

/// Compiles project sources into class files.
pub trait Compiler {
    fn compile(&self, spec: &CompileSpec) -> Result<CompileOutcome>;
}

/// Runs `javac`, and `kotlinc` first when Kotlin sources are present.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    javac: PathBuf,
    kotlinc: PathBuf,
    kotlin_stdlib: Option<PathBuf>,
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self {
            javac: PathBuf::from("javac"),
            kotlinc: PathBuf::from("kotlinc"),
            kotlin_stdlib: None,
        }
    }
}

impl ProcessCompiler {
    /// Locates the tools from `JAVA_HOME` and `KOTLIN_HOME` when defined.
    pub fn from_env(env: &BTreeMap<String, String>) -> Self {
        let mut compiler = Self::default();
        if let Some(java_home) = env.get("JAVA_HOME") {
            compiler.javac = Path::new(java_home).join("bin").join("javac");
        }
        if let Some(kotlin_home) = env.get("KOTLIN_HOME") {
            let home = Path::new(kotlin_home);
            compiler.kotlinc = home.join("bin").join("kotlinc");
            compiler.kotlin_stdlib = Some(home.join("lib").join("kotlin-stdlib.jar"));
        }
        compiler
    }

    fn run(&self, program: &Path, args: &[String]) -> Result<bool> {
        debug!("Running {} {}", program.display(), args.join(" "));
        let status = Command::new(program).args(args).status().map_err(|e| {
            Error::Other(format!("Cannot run {}: {e}", program.display()))
        })?;
        Ok(status.success())
    }

    fn base_args(spec: &CompileSpec, classpath: &PathSequence) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            spec.output_dir.display().to_string(),
        ];
        if !classpath.is_empty() {
            args.push("-cp".to_string());
            args.push(classpath.to_path_string());
        }
        args.extend(spec.options.iter().cloned());
        args
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&self, spec: &CompileSpec) -> Result<CompileOutcome> {
        std::fs::create_dir_all(&spec.output_dir)?;
        let (kotlin, java): (Vec<&PathBuf>, Vec<&PathBuf>) = spec
            .sources
            .iter()
            .partition(|source| source.extension().is_some_and(|ext| ext == "kt"));
        let mut outcome = CompileOutcome::success();

        if !kotlin.is_empty() {
            let Some(stdlib) = &self.kotlin_stdlib else {
                warn!("Kotlin sources found but KOTLIN_HOME is not defined");
                return Ok(CompileOutcome::failure());
            };
            info!("Compiling {} Kotlin sources", kotlin.len());
            let classpath = spec.classpath.clone().and_path(stdlib);
            let mut args = Self::base_args(spec, &classpath);
            args.push("-nowarn".to_string());
            // kotlinc also reads the Java sources to resolve mixed references
            args.extend(spec.sources.iter().map(|s| s.display().to_string()));
            outcome.success &= self.run(&self.kotlinc, &args)?;
            outcome.extra_classpath = outcome.extra_classpath.and_path(stdlib);
        }

        if !java.is_empty() && outcome.success {
            info!("Compiling {} Java sources", java.len());
            let classpath = spec
                .classpath
                .clone()
                .and_path(&spec.output_dir)
                .and(&outcome.extra_classpath);
            let mut args = Self::base_args(spec, &classpath);
            args.extend(java.iter().map(|s| s.display().to_string()));
            outcome.success &= self.run(&self.javac, &args)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env() {
        let env = BTreeMap::from([
            ("JAVA_HOME".to_string(), "/opt/jdk".to_string()),
            ("KOTLIN_HOME".to_string(), "/opt/kotlin".to_string()),
        ]);
        let compiler = ProcessCompiler::from_env(&env);
        assert_eq!(compiler.javac, Path::new("/opt/jdk/bin/javac"));
        assert_eq!(
            compiler.kotlin_stdlib.as_deref(),
            Some(Path::new("/opt/kotlin/lib/kotlin-stdlib.jar"))
        );
    }

    #[test]
    fn test_base_args() {
        let spec = CompileSpec {
            sources: vec![],
            classpath: PathSequence::of(["/a.jar"]),
            output_dir: PathBuf::from("/out"),
            options: vec!["-Xlint".to_string()],
        };
        let args = ProcessCompiler::base_args(&spec, &spec.classpath);
        assert_eq!(args, vec!["-d", "/out", "-cp", "/a.jar", "-Xlint"]);
    }

    #[test]
    fn test_missing_tool_is_an_error() {
        let compiler = ProcessCompiler {
            javac: PathBuf::from("/nonexistent/javac"),
            ..Default::default()
        };
        let temp_dir = tempfile::TempDir::new().unwrap();
        let spec = CompileSpec {
            sources: vec![PathBuf::from("A.java")],
            output_dir: temp_dir.path().join("out"),
            ..Default::default()
        };
        assert!(compiler.compile(&spec).is_err());
    }
}
