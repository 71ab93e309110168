use std::io;
use std::path::PathBuf;

/// Errors that can occur while resolving and running KBeans
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{}", not_found_message(.name, .available))]
    KBeanNotFound { name: String, available: Vec<String> },

    #[error(
        "Several classes match bean name '{name}' : [{}]. Please use the fully qualified class name of the bean instead of its short name.",
        .matches.join(", ")
    )]
    AmbiguousKBean { name: String, matches: Vec<String> },

    #[error("No class {0} found in classpath. Execute 'jeka -help' to see available KBeans.")]
    StaleClass(String),

    #[error("No {kind} '{member}' found on KBean {bean}. Available: [{}]", .available.join(", "))]
    UnknownMember {
        kind: &'static str,
        member: String,
        bean: String,
        available: Vec<String>,
    },

    #[error("Cannot inject '{key}' into {class}: {reason}")]
    InjectionError {
        class: String,
        key: String,
        reason: String,
    },

    #[error("No public no-arg method '{method}' found on {bean} (base dir: {})", .base_dir.display())]
    MethodNotFound {
        method: String,
        bean: String,
        base_dir: PathBuf,
    },

    #[error("Compilation of {} failed", .0.display())]
    CompilationError(PathBuf),

    #[error("Cannot import bean {class} into field '{field}' of {holder} (base dir: {}): {reason}", .base_dir.display())]
    ImportError {
        holder: String,
        field: String,
        class: String,
        base_dir: PathBuf,
        reason: String,
    },

    #[error("Dependency resolution error: {0}")]
    ResolutionError(String),

    #[error("KBean {0} is already in use, it cannot be accessed while its own method or init is running")]
    BeanBusy(String),

    #[error("Cannot instantiate abstract KBean {0}")]
    AbstractKBean(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for jeka-runner operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps this error with the bean, field or base dir it happened on.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach context to errors the same way `anyhow::Context` does, without leaving
/// the typed error.
pub trait ResultExt<T> {
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

fn not_found_message(name: &str, available: &[String]) -> String {
    let mut message = format!(
        "Can not find a KBean named '{name}'.\nThe name to identify a KBean can be :\
         \n  - The fully qualified class name of the KBean (e.g. org.foo.BarKBean)\
         \n  - The simple class name (e.g. BarKBean)\
         \n  - The uncapitalized simple class name (e.g. barKBean)\
         \n  - The simple class name minus the 'KBean' suffix. (e.g. Bar)\
         \n  - The uncapitalized simple class name minus the 'KBean' suffix. (e.g. bar)\
         \nAvailable KBeans :"
    );
    for candidate in available {
        message.push_str("\n  ");
        message.push_str(candidate);
    }
    message
}
