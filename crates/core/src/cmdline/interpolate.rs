use crate::config::Properties;
use crate::constants::{CMD_APPEND_PROP, CMD_PROP_PREFIX};
use tracing::debug;

/// Replaces `$name` and `::name` tokens by the words of property
/// `jeka.cmd.<name>`, then appends the words of `jeka.cmd._append`.
///
/// Substituted words are not expanded again. Tokens naming no property are
/// kept verbatim.
pub fn expand_shorthands(tokens: &[String], props: &Properties) -> Vec<String> {
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        let alias = token
            .strip_prefix("::")
            .or_else(|| token.strip_prefix('$'))
            .filter(|name| !name.is_empty());
        let replacement = alias.and_then(|name| props.get(&format!("{CMD_PROP_PREFIX}{name}")));
        match replacement {
            Some(value) => {
                debug!("Expanding {token} to {value}");
                result.extend(split_words(&value));
            }
            None => result.push(token.clone()),
        }
    }
    if let Some(append) = props.get(CMD_APPEND_PROP) {
        debug!("Appending {append}");
        result.extend(split_words(&append));
    }
    result
}

/// Splits on whitespace, keeping single or double quoted sections together.
pub fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
