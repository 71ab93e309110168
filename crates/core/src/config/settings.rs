use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Default tracing filter for this verbosity.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// Behavior switches derived from the standard `-xxx` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// Bean targeted by actions without an explicit `bean:` scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_kbean: Option<String>,
    pub verbosity: Verbosity,
    pub stacktrace: bool,
    pub runtime_info: bool,
    pub clean_work: bool,
    pub clean_output: bool,
    pub ignore_compile_failure: bool,
    pub skip_sources: bool,
    pub help: bool,
}

const OPTIONS: &[(&[&str], &str)] = &[
    (&["kb", "kbean"], "Default KBean, used by actions without a 'bean:' scope"),
    (&["v", "verbose"], "Log progress information"),
    (&["vv", "debug"], "Log debug information"),
    (&["st", "stacktrace"], "Display the full error chain on failure"),
    (&["ri", "runtime-info"], "Display the effective actions of each project"),
    (&["cw", "clean-work"], "Delete the work directory before running"),
    (&["co", "clean-output"], "Delete the output directory before running"),
    (&["ic", "ignore-compile-failure"], "Continue when jeka-src compilation fails"),
    (&["ks", "skip-src"], "Do not compile jeka-src nor use its KBeans"),
    (&["h", "help"], "Display help"),
];

impl Settings {
    /// Interprets standard options, keys without their leading `-`. Unknown
    /// options are reported and ignored.
    pub fn from_options(options: &BTreeMap<String, Option<String>>) -> Self {
        let mut settings = Settings::default();
        for (name, value) in options {
            match name.as_str() {
                "kb" | "kbean" => settings.default_kbean = value.clone().filter(|v| !v.is_empty()),
                "v" | "verbose" => settings.verbosity = settings.verbosity.max(Verbosity::Verbose),
                "vv" | "debug" => settings.verbosity = Verbosity::Debug,
                "st" | "stacktrace" => settings.stacktrace = true,
                "ri" | "runtime-info" => settings.runtime_info = true,
                "cw" | "clean-work" => settings.clean_work = true,
                "co" | "clean-output" => settings.clean_output = true,
                "ic" | "ignore-compile-failure" => settings.ignore_compile_failure = true,
                "ks" | "skip-src" => settings.skip_sources = true,
                "h" | "help" => settings.help = true,
                other => warn!("Unknown option '-{other}' ignored"),
            }
        }
        settings
    }

    /// Names and descriptions of the recognized options, for help output.
    pub fn option_docs() -> Vec<(String, &'static str)> {
        OPTIONS
            .iter()
            .map(|(names, doc)| {
                let names = names
                    .iter()
                    .map(|name| format!("-{name}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                (names, *doc)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_settings_from_options() {
        let settings = Settings::from_options(&options(&[
            ("kb", Some("project")),
            ("v", None),
            ("ic", None),
            ("ks", None),
        ]));
        assert_eq!(settings.default_kbean.as_deref(), Some("project"));
        assert_eq!(settings.verbosity, Verbosity::Verbose);
        assert!(settings.ignore_compile_failure);
        assert!(settings.skip_sources);
        assert!(!settings.clean_work);
    }

    #[test]
    fn test_debug_wins_over_verbose() {
        let settings = Settings::from_options(&options(&[("debug", None), ("verbose", None)]));
        assert_eq!(settings.verbosity, Verbosity::Debug);
        assert_eq!(settings.verbosity.filter_directive(), "debug");
    }

    #[test]
    fn test_unknown_option_is_ignored() {
        let settings = Settings::from_options(&options(&[("nope", Some("x"))]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_option_docs() {
        let docs = Settings::option_docs();
        assert_eq!(docs[0].0, "-kb, -kbean");
        assert_eq!(docs.len(), 10);
    }
}
