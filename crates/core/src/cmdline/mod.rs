//! Command-line handling: shell pre-pass, shorthand expansion and token
//! classification.

pub mod interpolate;
pub mod tokenizer;

pub use interpolate::{expand_shorthands, split_words};
pub use tokenizer::{ParsedCmdLine, strip_shell_tokens, tokenize};
