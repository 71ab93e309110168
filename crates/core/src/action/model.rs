use crate::bean::short_name;
use crate::config::is_sensitive_key;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Init,
    SetField { field: String, value: String },
    Invoke { method: String },
}

/// Where an action comes from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    CommandLine,
    Properties(String),
    InitBean,
    /// Instantiated on behalf of another bean, by import or lookup.
    Loaded,
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSource::CommandLine => f.write_str("command line"),
            ActionSource::Properties(origin) => write!(f, "properties ({origin})"),
            ActionSource::InitBean => f.write_str("init bean"),
            ActionSource::Loaded => f.write_str("loaded by another KBean"),
        }
    }
}

/// One instruction on a resolved bean class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KBeanAction {
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Fully qualified class name of the target bean.
    pub bean: String,
    pub source: ActionSource,
}

impl KBeanAction {
    pub fn init(bean: &str, source: ActionSource) -> Self {
        Self {
            kind: ActionKind::Init,
            bean: bean.to_string(),
            source,
        }
    }

    pub fn set_field(bean: &str, field: &str, value: &str, source: ActionSource) -> Self {
        Self {
            kind: ActionKind::SetField {
                field: field.to_string(),
                value: value.to_string(),
            },
            bean: bean.to_string(),
            source,
        }
    }

    pub fn invoke(bean: &str, method: &str, source: ActionSource) -> Self {
        Self {
            kind: ActionKind::Invoke {
                method: method.to_string(),
            },
            bean: bean.to_string(),
            source,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self.kind, ActionKind::Init)
    }

    pub fn is_invoke(&self) -> bool {
        matches!(self.kind, ActionKind::Invoke { .. })
    }

    /// Name of the action type, as displayed.
    pub fn label(&self) -> &'static str {
        match self.kind {
            ActionKind::Init => "INIT",
            ActionKind::SetField { .. } => "SET_FIELD",
            ActionKind::Invoke { .. } => "INVOKE",
        }
    }

    /// `bean.member=value` with sensitive values masked.
    pub fn target(&self) -> String {
        let bean = short_name(&self.bean);
        match &self.kind {
            ActionKind::Init => bean,
            ActionKind::SetField { field, value } => {
                let shown = if is_sensitive_key(field) { "***" } else { value.as_str() };
                format!("{bean}.{field}={shown}")
            }
            ActionKind::Invoke { method } => format!("{bean}#{method}()"),
        }
    }
}

impl fmt::Display for KBeanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.target())
    }
}
