use super::descriptor::{FieldAccess, ObjectDescriptor};
use crate::error::{Error, Result};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Sets property fields from raw string values.
pub struct FieldInjector;

impl FieldInjector {
    /// Injects every value whose key designates a field of `descriptor`,
    /// directly or through a dotted nested path. Returns the consumed keys;
    /// the others are left for the caller to report.
    pub fn inject(
        descriptor: &ObjectDescriptor,
        target: &mut dyn Any,
        values: &BTreeMap<String, String>,
    ) -> Result<BTreeSet<String>> {
        Self::inject_with_prefix(descriptor, target, values, "")
    }

    fn inject_with_prefix(
        descriptor: &ObjectDescriptor,
        target: &mut dyn Any,
        values: &BTreeMap<String, String>,
        prefix: &str,
    ) -> Result<BTreeSet<String>> {
        let mut consumed = BTreeSet::new();
        for field in descriptor.fields() {
            let key = format!("{prefix}{}", field.name);
            let error = |reason: String| Error::InjectionError {
                class: descriptor.type_name().to_string(),
                key: key.clone(),
                reason,
            };

            if let Some(raw) = values.get(&field.name) {
                if field.is_final {
                    return Err(error("field is final".to_string()));
                }
                match &field.access {
                    FieldAccess::Value(setter) => setter(target, raw).map_err(&error)?,
                    _ => {
                        return Err(error(format!(
                            "unhandled field type {} for value '{raw}'",
                            field.kind
                        )));
                    }
                }
                debug!("Injected {key}={raw} into {}", descriptor.type_name());
                consumed.insert(field.name.clone());
                continue;
            }

            let nested_prefix = format!("{}.", field.name);
            let nested_values: BTreeMap<String, String> = values
                .iter()
                .filter_map(|(k, v)| k.strip_prefix(&nested_prefix).map(|sub| (sub.to_string(), v.clone())))
                .collect();
            if nested_values.is_empty() {
                continue;
            }
            if field.is_final {
                return Err(error("field is final, its nested values cannot be set".to_string()));
            }
            let FieldAccess::Nested { descriptor: nested, slot } = &field.access else {
                continue;
            };
            let nested_target = slot
                .get_or_create(target)
                .ok_or_else(|| error("cannot instantiate nested value".to_string()))?;
            let nested_consumed = Self::inject_with_prefix(
                nested,
                nested_target,
                &nested_values,
                &format!("{key}."),
            )?;
            consumed.extend(
                nested_consumed
                    .into_iter()
                    .map(|sub| format!("{nested_prefix}{sub}")),
            );
        }
        Ok(consumed)
    }
}
