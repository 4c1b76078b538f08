//! Attribute validation from config rules. Collects errors per attribute instead of failing fast.

use crate::config::ValidationRule;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Errors per attribute, in attribute name order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, attribute: &str, message: String) {
        self.errors.entry(attribute.to_string()).or_default().push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn first_error_message(&self) -> Option<&str> {
        self.errors.values().find_map(|v| v.first()).map(String::as_str)
    }

    /// First error of each attribute.
    pub fn first_errors(&self) -> Map<String, Value> {
        self.errors
            .iter()
            .filter_map(|(k, v)| v.first().map(|m| (k.clone(), Value::String(m.clone()))))
            .collect()
    }
}

pub struct AttributeValidator;

impl AttributeValidator {
    /// Full validation (create): required attributes must be present and non-null.
    pub fn validate(attrs: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for (attr, rule) in rules {
            match attrs.get(attr) {
                None | Some(Value::Null) if rule.required == Some(true) => {
                    errors.add(attr, format!("{} cannot be blank", attr));
                }
                Some(v) => validate_attribute(attr, v, rule, &mut errors),
                None => {}
            }
        }
        errors
    }

    /// Partial validation (update): only attributes present are checked.
    pub fn validate_partial(attrs: &Map<String, Value>, rules: &HashMap<String, ValidationRule>) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for (attr, v) in attrs {
            if let Some(rule) = rules.get(attr) {
                if v.is_null() && rule.required == Some(true) {
                    errors.add(attr, format!("{} cannot be blank", attr));
                } else {
                    validate_attribute(attr, v, rule, &mut errors);
                }
            }
        }
        errors
    }
}

fn validate_attribute(attr: &str, v: &Value, rule: &ValidationRule, errors: &mut ValidationErrors) {
    if v.is_null() {
        return;
    }
    if let Some(format) = &rule.format {
        if let Some(msg) = check_format(attr, v, format) {
            errors.add(attr, msg);
        }
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                errors.add(attr, format!("{} must be at most {} characters", attr, max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                errors.add(attr, format!("{} must be at least {} characters", attr, min));
            }
        }
        if let Some(pattern) = &rule.pattern {
            match Regex::new(pattern) {
                Ok(re) if !re.is_match(s) => errors.add(attr, format!("{} is invalid", attr)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(attribute = attr, error = %e, "invalid validation pattern");
                    errors.add(attr, format!("invalid pattern for {}", attr));
                }
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            errors.add(attr, format!("{} is not an allowed value", attr));
        }
    }
    if let Some(n) = numeric(v) {
        if let Some(min) = rule.minimum {
            if n < min {
                errors.add(attr, format!("{} must be no less than {}", attr, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                errors.add(attr, format!("{} must be no greater than {}", attr, max));
            }
        }
    }
}

/// Numbers, and strings that parse as numbers (form and query input arrive as strings).
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => n.to_string() == *s,
        _ => a == b,
    }
}

fn check_format(attr: &str, v: &Value, format: &str) -> Option<String> {
    let s = v.as_str()?;
    match format.to_lowercase().as_str() {
        "email" => {
            let ok = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            (!ok).then(|| format!("{} is not a valid email address", attr))
        }
        "uuid" => uuid::Uuid::parse_str(s)
            .is_err()
            .then(|| format!("{} must be a valid UUID", attr)),
        "integer" => s
            .parse::<i64>()
            .is_err()
            .then(|| format!("{} must be an integer", attr)),
        _ => None,
    }
}
