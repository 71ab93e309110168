use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw arguments classified by prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCmdLine {
    /// `-name` / `-name=value` options, keyed without the leading dash.
    pub standard_options: BTreeMap<String, Option<String>>,
    /// `-Dkey=value` overrides.
    pub system_properties: BTreeMap<String, String>,
    /// `@descriptor` dependency references, without the `@`.
    pub dependencies: Vec<String>,
    /// Everything else, in order, for the action parser.
    pub actions: Vec<String>,
}

impl ParsedCmdLine {
    pub fn has_option(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.standard_options.contains_key(*name))
    }
}

/// Removes the tokens consumed by the shell wrapper: a leading `-r <value>`
/// or `-rc <value>` pair, or a leading `@alias`.
pub fn strip_shell_tokens(args: &[String]) -> Vec<String> {
    match args.first().map(String::as_str) {
        Some("-r") | Some("-rc") => {
            debug!("Stripping shell tokens {:?}", &args[..args.len().min(2)]);
            args.iter().skip(2).cloned().collect()
        }
        Some(first) if first.starts_with('@') => {
            debug!("Stripping shell alias {first}");
            args[1..].to_vec()
        }
        _ => args.to_vec(),
    }
}

/// Classifies each argument by its prefix.
pub fn tokenize(args: &[String]) -> Result<ParsedCmdLine> {
    let mut parsed = ParsedCmdLine::default();
    for arg in args {
        if let Some(property) = arg.strip_prefix("-D") {
            let (key, value) = property.split_once('=').ok_or_else(|| {
                Error::ParseError(format!(
                    "Argument '{arg}' does not mention '=' as expected to assign a value."
                ))
            })?;
            if key.is_empty() {
                return Err(Error::ParseError(format!("Argument '{arg}' has an empty property name.")));
            }
            parsed.system_properties.insert(key.to_string(), value.to_string());
        } else if let Some(option) = arg.strip_prefix('-') {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (option, None),
            };
            if name.is_empty() {
                return Err(Error::ParseError(format!("Argument '{arg}' has an empty option name.")));
            }
            parsed.standard_options.insert(name.to_string(), value);
        } else if let Some(descriptor) = arg.strip_prefix('@') {
            if descriptor.is_empty() {
                return Err(Error::ParseError("Argument '@' must be followed by a dependency.".to_string()));
            }
            parsed.dependencies.push(descriptor.to_string());
        } else {
            parsed.actions.push(arg.clone());
        }
    }
    debug!("Parsed command line: {:?}", parsed);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_tokenize_classifies_arguments() {
        let parsed = tokenize(&args(
            "-Dfoo=bar -kb=project -v @org.lib:lib:1.0 @../other project: version=1 pack",
        ))
        .unwrap();
        assert_eq!(parsed.system_properties.get("foo").unwrap(), "bar");
        assert_eq!(parsed.standard_options.get("kb").unwrap().as_deref(), Some("project"));
        assert_eq!(parsed.standard_options.get("v").unwrap(), &None);
        assert_eq!(parsed.dependencies, vec!["org.lib:lib:1.0", "../other"]);
        assert_eq!(parsed.actions, vec!["project:", "version=1", "pack"]);
        assert!(parsed.has_option(&["verbose", "v"]));
    }

    #[test]
    fn test_system_property_requires_equals() {
        let err = tokenize(&args("-Dfoo")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Parse error: Argument '-Dfoo' does not mention '=' as expected to assign a value.");
    }

    #[test]
    fn test_system_property_with_empty_value() {
        let parsed = tokenize(&args("-Dfoo=")).unwrap();
        assert_eq!(parsed.system_properties.get("foo").unwrap(), "");
    }

    #[test]
    fn test_empty_option_name_fails() {
        assert!(tokenize(&args("-=x")).is_err());
        assert!(tokenize(&args("@")).is_err());
    }

    #[test]
    fn test_strip_shell_tokens() {
        assert_eq!(strip_shell_tokens(&args("-r https://repo/app.git pack")), args("pack"));
        assert_eq!(strip_shell_tokens(&args("-rc ../app -v")), args("-v"));
        assert_eq!(strip_shell_tokens(&args("@tool project: pack")), args("project: pack"));
        assert_eq!(strip_shell_tokens(&args("project: @x")), args("project: @x"));
        assert!(strip_shell_tokens(&args("-r")).is_empty());
    }
}
