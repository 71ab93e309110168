use super::model::{ActionKind, ActionSource, KBeanAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered actions with deduplication: INIT once per bean, SET_FIELD
/// last-writer-wins in place, INVOKE always appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionContainer {
    actions: Vec<KBeanAction>,
}

impl ActionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, action: KBeanAction) {
        match &action.kind {
            ActionKind::Invoke { .. } => self.actions.push(action),
            ActionKind::Init => {
                if !self.actions.iter().any(|a| a.is_init() && a.bean == action.bean) {
                    self.actions.push(action);
                }
            }
            ActionKind::SetField { field, .. } => {
                let existing = self.actions.iter().position(|a| {
                    a.bean == action.bean
                        && matches!(&a.kind, ActionKind::SetField { field: f, .. } if f == field)
                });
                match existing {
                    Some(index) => self.actions[index] = action,
                    None => self.actions.push(action),
                }
            }
        }
    }

    pub fn add_all(&mut self, actions: impl IntoIterator<Item = KBeanAction>) {
        for action in actions {
            self.add(action);
        }
    }

    /// Moves or inserts the INIT action of `bean` at the front.
    pub fn with_init_bean_first(mut self, bean: &str) -> Self {
        let source = match self.actions.iter().position(|a| a.is_init() && a.bean == bean) {
            Some(index) => self.actions.remove(index).source,
            None => ActionSource::InitBean,
        };
        self.actions.insert(0, KBeanAction::init(bean, source));
        self
    }

    pub fn actions(&self) -> &[KBeanAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn invokes(&self) -> impl Iterator<Item = &KBeanAction> {
        self.actions.iter().filter(|a| a.is_invoke())
    }

    /// Field values to inject into `bean`.
    pub fn set_values_for(&self, bean: &str) -> BTreeMap<String, String> {
        self.actions
            .iter()
            .filter(|a| a.bean == bean)
            .filter_map(|a| match &a.kind {
                ActionKind::SetField { field, value } => Some((field.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// SET_FIELD actions targeting `bean`.
    pub fn set_actions_for<'a>(&'a self, bean: &'a str) -> impl Iterator<Item = &'a KBeanAction> + 'a {
        self.actions
            .iter()
            .filter(move |a| a.bean == bean && matches!(a.kind, ActionKind::SetField { .. }))
    }

    /// Beans referenced by INIT or INVOKE actions, in first-seen order.
    pub fn involved_beans(&self) -> Vec<String> {
        let mut beans: Vec<String> = Vec::new();
        for action in &self.actions {
            if matches!(action.kind, ActionKind::SetField { .. }) {
                continue;
            }
            if !beans.contains(&action.bean) {
                beans.push(action.bean.clone());
            }
        }
        beans
    }
}

impl FromIterator<KBeanAction> for ActionContainer {
    fn from_iter<I: IntoIterator<Item = KBeanAction>>(iter: I) -> Self {
        let mut container = ActionContainer::new();
        container.add_all(iter);
        container
    }
}

impl<'a> IntoIterator for &'a ActionContainer {
    type Item = &'a KBeanAction;
    type IntoIter = std::slice::Iter<'a, KBeanAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
