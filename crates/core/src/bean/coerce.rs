//! String to field value conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Declared type of a property field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Long,
    Short,
    Byte,
    Double,
    Float,
    Path,
    Enum(Vec<String>),
    Nested(String),
    Unsupported(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("String"),
            FieldKind::Bool => f.write_str("boolean"),
            FieldKind::Int => f.write_str("int"),
            FieldKind::Long => f.write_str("long"),
            FieldKind::Short => f.write_str("short"),
            FieldKind::Byte => f.write_str("byte"),
            FieldKind::Double => f.write_str("double"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Path => f.write_str("Path"),
            FieldKind::Enum(constants) => write!(f, "enum [{}]", constants.join(", ")),
            FieldKind::Nested(type_name) | FieldKind::Unsupported(type_name) => {
                f.write_str(type_name)
            }
        }
    }
}

/// A type that property fields can hold.
pub trait FieldValue: Sized + 'static {
    fn kind() -> FieldKind;

    /// Parses the raw text. The error is a short reason, the caller adds the
    /// field and class.
    fn parse_value(raw: &str) -> Result<Self, String>;
}

/// Enum fields, matched on the exact constant name.
pub trait EnumField: Clone + 'static {
    fn constants() -> &'static [(&'static str, Self)];

    fn constant_names() -> Vec<String> {
        Self::constants()
            .iter()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn value_of(raw: &str) -> Result<Self, String> {
        Self::constants()
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| {
                format!(
                    "'{raw}' is not one of [{}]",
                    Self::constant_names().join(", ")
                )
            })
    }
}

impl FieldValue for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl FieldValue for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn parse_value(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(true),
            v if v.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(format!("'{raw}' is not a boolean, expected true or false")),
        }
    }
}

impl FieldValue for PathBuf {
    fn kind() -> FieldKind {
        FieldKind::Path
    }

    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(PathBuf::from(raw))
    }
}

macro_rules! numeric_field_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn parse_value(raw: &str) -> Result<Self, String> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|e| format!("'{raw}' is not a valid {}: {e}", FieldKind::$kind))
                }
            }
        )*
    };
}

numeric_field_value! {
    i32 => Int,
    i64 => Long,
    i16 => Short,
    i8 => Byte,
    f64 => Double,
    f32 => Float,
}

/// Optional fields become `None` on empty text.
impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> FieldKind {
        T::kind()
    }

    fn parse_value(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            Ok(None)
        } else {
            T::parse_value(raw).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Packaging {
        Jar,
        War,
    }

    impl EnumField for Packaging {
        fn constants() -> &'static [(&'static str, Self)] {
            &[("JAR", Packaging::Jar), ("WAR", Packaging::War)]
        }
    }

    #[test]
    fn test_bool() {
        assert_eq!(bool::parse_value("true"), Ok(true));
        assert_eq!(bool::parse_value("FALSE"), Ok(false));
        assert!(bool::parse_value("yes").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(i32::parse_value("42"), Ok(42));
        assert_eq!(i64::parse_value(" -7 "), Ok(-7));
        assert_eq!(f64::parse_value("1.5"), Ok(1.5));
        assert!(i8::parse_value("300").is_err());
        let err = i32::parse_value("notanumber").unwrap_err();
        assert!(err.starts_with("'notanumber' is not a valid int"));
    }

    #[test]
    fn test_enum_value_of() {
        assert_eq!(Packaging::value_of("WAR"), Ok(Packaging::War));
        assert_eq!(
            Packaging::value_of("war"),
            Err("'war' is not one of [JAR, WAR]".to_string())
        );
    }

    #[test]
    fn test_optional() {
        assert_eq!(Option::<i32>::parse_value(""), Ok(None));
        assert_eq!(Option::<i32>::parse_value("3"), Ok(Some(3)));
        assert_eq!(Option::<String>::kind(), FieldKind::String);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FieldKind::Enum(vec!["A".into(), "B".into()]).to_string(), "enum [A, B]");
        assert_eq!(FieldKind::Long.to_string(), "long");
    }
}
