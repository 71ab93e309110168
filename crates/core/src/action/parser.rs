use super::container::ActionContainer;
use super::model::{ActionSource, KBeanAction};
use crate::bean::{KBeanDescriptor, short_name};
use crate::config::Properties;
use crate::constants::{KBEAN_CMD_SUFFIX, KBEAN_PROPERTY_SEPARATOR};
use crate::discovery::ClassDiscovery;
use crate::error::{Error, Result, ResultExt};
use std::rc::Rc;
use tracing::{debug, warn};

/// Turns action tokens and `bean#field` properties into resolved actions.
pub struct ActionParser<'a> {
    discovery: &'a mut ClassDiscovery,
    default_bean: String,
}

/// Tokens following an optional `bean:` marker.
struct Scope<'t> {
    bean_name: Option<&'t str>,
    tokens: Vec<&'t str>,
}

impl<'a> ActionParser<'a> {
    /// `default_bean` is the class targeted by tokens without a scope.
    pub fn new(discovery: &'a mut ClassDiscovery, default_bean: &str) -> Self {
        Self {
            discovery,
            default_bean: default_bean.to_string(),
        }
    }

    /// Property actions first, then command-line ones, so the command line
    /// wins on identical fields.
    pub fn parse(&mut self, props: &Properties, tokens: &[String]) -> Result<ActionContainer> {
        let mut container = ActionContainer::new();
        container.add_all(self.parse_properties(props)?);
        container.add_all(self.parse_command_line(tokens)?);
        debug!("Parsed {} actions", container.len());
        Ok(container)
    }

    /// Command-line tokens. Unknown beans and members are errors.
    pub fn parse_command_line(&mut self, tokens: &[String]) -> Result<Vec<KBeanAction>> {
        let mut actions = Vec::new();
        for scope in split_scopes(tokens)? {
            let bean = match scope.bean_name {
                Some(name) => self.discovery.resolve_name(name)?,
                None => self.default_bean.clone(),
            };
            let descriptor = self.descriptor(&bean)?;
            actions.push(KBeanAction::init(&bean, ActionSource::CommandLine));
            for token in scope.tokens {
                actions.push(member_action(&descriptor, token, ActionSource::CommandLine)?);
            }
        }
        Ok(actions)
    }

    /// Entries keyed `bean#field`. A key ending with `#` only initializes the
    /// bean. Unknown beans or fields are reported and skipped, ambiguous bean
    /// names are errors.
    pub fn parse_properties(&mut self, props: &Properties) -> Result<Vec<KBeanAction>> {
        let mut actions = Vec::new();
        for key in props.keys() {
            let Some((bean_name, field)) = key.split_once(KBEAN_PROPERTY_SEPARATOR) else {
                continue;
            };
            let source = ActionSource::Properties(props.source_of(key).unwrap_or_default().to_string());
            let bean = if bean_name.is_empty() {
                self.default_bean.clone()
            } else {
                match self.discovery.try_resolve_name(bean_name)? {
                    Some(bean) => bean,
                    None => {
                        warn!("Property '{key}' refers to unknown KBean '{bean_name}', ignored ({source})");
                        continue;
                    }
                }
            };
            let descriptor = self.descriptor(&bean)?;
            actions.push(KBeanAction::init(&bean, source.clone()));
            if field.is_empty() {
                continue;
            }
            if !descriptor.fields().has_field_path(field) {
                warn!(
                    "Property '{key}' refers to unknown field '{field}' of KBean {}, ignored ({source})",
                    short_name(&bean)
                );
                continue;
            }
            let value = props.get(key).unwrap_or_default();
            actions.push(KBeanAction::set_field(&bean, field, &value, source));
        }
        Ok(actions)
    }

    fn descriptor(&mut self, bean: &str) -> Result<Rc<KBeanDescriptor>> {
        self.discovery
            .load(bean)
            .with_context(|| format!("Loading KBean {bean}"))
    }
}

fn split_scopes(tokens: &[String]) -> Result<Vec<Scope<'_>>> {
    let mut scopes: Vec<Scope> = Vec::new();
    for token in tokens {
        if let Some(name) = token.strip_suffix(KBEAN_CMD_SUFFIX).filter(|_| !token.contains('=')) {
            if name.is_empty() {
                return Err(Error::ParseError(format!(
                    "Token '{token}' must name a KBean before '{KBEAN_CMD_SUFFIX}'"
                )));
            }
            scopes.push(Scope {
                bean_name: Some(name),
                tokens: Vec::new(),
            });
            continue;
        }
        match scopes.last_mut() {
            Some(scope) => scope.tokens.push(token),
            None => scopes.push(Scope {
                bean_name: None,
                tokens: vec![token],
            }),
        }
    }
    Ok(scopes)
}

fn member_action(descriptor: &KBeanDescriptor, token: &str, source: ActionSource) -> Result<KBeanAction> {
    let bean = descriptor.class_name();
    if let Some((field, value)) = token.split_once('=') {
        if !descriptor.fields().has_field_path(field) {
            return Err(Error::UnknownMember {
                kind: "field",
                member: field.to_string(),
                bean: short_name(bean),
                available: descriptor.fields().field_paths(),
            });
        }
        return Ok(KBeanAction::set_field(bean, field, value, source));
    }
    if descriptor.method(token).is_none() {
        return Err(Error::UnknownMember {
            kind: "method",
            member: token.to_string(),
            bean: short_name(bean),
            available: descriptor
                .method_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
    }
    Ok(KBeanAction::invoke(bean, token, source))
}
