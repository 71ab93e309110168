//! Well-known directory names, file names and property keys.

/// Version of this tool, used in compile fingerprints and as the default
/// version of `dev.jeka` coordinates.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Group of the artifacts published by this tool.
pub const TOOL_GROUP: &str = "dev.jeka";

/// Class name suffix stripped to compute short KBean names.
pub const KBEAN_CLASS_SUFFIX: &str = "KBean";

/// Token suffix introducing a KBean scope on the command line (`project:`).
pub const KBEAN_CMD_SUFFIX: char = ':';

/// Separator between bean name and field in property keys (`project#version`).
pub const KBEAN_PROPERTY_SEPARATOR: char = '#';

pub const JEKA_SRC_DIR: &str = "jeka-src";
pub const JEKA_WORK_DIR: &str = ".jeka-work";
pub const JEKA_SRC_CLASSES_DIR: &str = "jeka-src-classes";
pub const JEKA_OUTPUT_DIR: &str = "jeka-output";
pub const JEKA_BOOT_DIR: &str = "jeka-boot";

pub const PROPERTIES_FILE: &str = "jeka.properties";
pub const GLOBAL_PROPERTIES_FILE: &str = "global.properties";

pub const RESOLVED_CLASSPATH_CACHE: &str = "resolved-classpath.json";
pub const KBEAN_CLASSES_CACHE: &str = "kbean-classes.json";
pub const COMPILE_FLAG_FILE: &str = "compile-flag.json";

/// Extension of index files listing the KBean classes of an archive.
pub const KBEAN_INDEX_EXTENSION: &str = "kbeans";

pub const CMD_PROP_PREFIX: &str = "jeka.cmd.";
pub const CMD_APPEND_PROP: &str = "jeka.cmd._append";
pub const DEFAULT_KBEAN_PROP: &str = "jeka.default.kbean";
pub const INJECT_CLASSPATH_PROP: &str = "jeka.inject.classpath";
pub const LOCAL_REPO_PROP: &str = "jeka.repos.local";

/// Environment variable overriding the user home of the tool.
pub const USER_HOME_ENV: &str = "JEKA_USER_HOME";
