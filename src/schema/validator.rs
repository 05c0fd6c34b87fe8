// JSON Schema validation engine
//
// Supported keywords:
//   core:        $ref, $defs, $id, $anchor
//   applicators: allOf, anyOf, oneOf, not, if/then/else, properties,
//                patternProperties, additionalProperties, propertyNames,
//                items, prefixItems, contains
//   validation:  type, enum, const, multipleOf, maximum, exclusiveMaximum,
//                minimum, exclusiveMinimum, maxLength, minLength, pattern,
//                maxItems, minItems, uniqueItems, maxContains, minContains,
//                maxProperties, minProperties, required, dependentRequired
//   format:      date-time, date, time, email, hostname, ipv4, ipv6, uri,
//                uuid
//
// Unknown keywords are ignored.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{SchemaError, SchemaRegistry, SchemaResource, SchemaResult};
use crate::node::{Node, Object};
use crate::resource::resolve_uri;

/// Maximum number of nested `$ref`s followed before giving up
const MAX_REFERENCE_DEPTH: usize = 64;

static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?([Zz]|[+-](\d{2}):(\d{2}))$").unwrap()
});
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$").unwrap()
});
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$").unwrap()
});
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});

/// Validates instances against the schemas of one resource.
///
/// Validation short-circuits: only the boolean outcome is computed.
pub struct Validator<'a> {
    /// Documents available to `$ref`
    registry: &'a SchemaRegistry,
    /// The resource being validated against
    resource: &'a SchemaResource,
    /// Whether `format` is an assertion
    format_validation: bool,
    /// Current `$ref` nesting
    depth: usize,
    /// Compiled `pattern` and `patternProperties` expressions
    patterns: HashMap<String, Regex>,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry, resource: &'a SchemaResource) -> Self {
        Self {
            registry,
            resource,
            format_validation: true,
            depth: 0,
            patterns: HashMap::new(),
        }
    }

    pub fn with_format_validation(mut self, enabled: bool) -> Self {
        self.format_validation = enabled;
        self
    }

    /// Validate an instance against a schema whose base URI is `base`.
    pub fn validate(&mut self, schema: &Node, instance: &Node, base: &Url) -> SchemaResult<bool> {
        let entries = match schema {
            Node::Bool(valid) => return Ok(*valid),
            Node::Object(entries) => entries,
            other => return Err(SchemaError::InvalidSchema(other.kind())),
        };

        let scoped;
        let base = match entries.get("$id").and_then(Node::as_str) {
            Some(id) => {
                scoped = resolve_uri(Some(base), id).map_err(|source| SchemaError::InvalidId {
                    id: id.to_string(),
                    source,
                })?;
                &scoped
            }
            None => base,
        };

        if let Some(reference) = entries.get("$ref").and_then(Node::as_str)
            && !self.validate_reference(reference, instance, base)?
        {
            return Ok(false);
        }

        Ok(self.validate_type(entries, instance)
            && validate_enum(entries, instance)
            && self.validate_format(entries, instance)
            && validate_number(entries, instance)
            && self.validate_string(entries, instance)?
            && self.validate_array(entries, instance, base)?
            && self.validate_object(entries, instance, base)?
            && self.validate_combinators(entries, instance, base)?)
    }

    fn validate_reference(&mut self, reference: &str, instance: &Node, base: &Url) -> SchemaResult<bool> {
        let uri = resolve_uri(Some(base), reference)
            .map_err(|_| SchemaError::UnresolvedReference(reference.to_string()))?;
        let target = self
            .registry
            .lookup(self.resource, &uri)
            .ok_or_else(|| SchemaError::UnresolvedReference(uri.to_string()))?;

        if self.depth >= MAX_REFERENCE_DEPTH {
            return Err(SchemaError::RecursiveReference(uri.to_string()));
        }

        let mut target_base = uri;
        target_base.set_fragment(None);

        self.depth += 1;
        let result = self.validate(target, instance, &target_base);
        self.depth -= 1;
        result
    }

    fn validate_type(&self, entries: &Object, instance: &Node) -> bool {
        match entries.get("type") {
            Some(Node::String(name)) => has_type(instance, name),
            Some(Node::Array(names)) => names
                .iter()
                .filter_map(Node::as_str)
                .any(|name| has_type(instance, name)),
            _ => true,
        }
    }

    fn validate_format(&self, entries: &Object, instance: &Node) -> bool {
        if !self.format_validation {
            return true;
        }
        match (entries.get("format").and_then(Node::as_str), instance) {
            (Some(format), Node::String(value)) => check_format(format, value),
            _ => true,
        }
    }

    fn validate_string(&mut self, entries: &Object, instance: &Node) -> SchemaResult<bool> {
        let Node::String(value) = instance else {
            return Ok(true);
        };

        let length = value.chars().count() as f64;
        if let Some(max) = number_keyword(entries, "maxLength")
            && length > max
        {
            return Ok(false);
        }
        if let Some(min) = number_keyword(entries, "minLength")
            && length < min
        {
            return Ok(false);
        }
        if let Some(pattern) = entries.get("pattern").and_then(Node::as_str)
            && !self.pattern(pattern)?.is_match(value)
        {
            return Ok(false);
        }
        Ok(true)
    }

    fn validate_array(&mut self, entries: &Object, instance: &Node, base: &Url) -> SchemaResult<bool> {
        let Node::Array(items) = instance else {
            return Ok(true);
        };

        let count = items.len() as f64;
        if number_keyword(entries, "maxItems").is_some_and(|max| count > max)
            || number_keyword(entries, "minItems").is_some_and(|min| count < min)
        {
            return Ok(false);
        }

        if matches!(entries.get("uniqueItems"), Some(Node::Bool(true))) {
            for (i, a) in items.iter().enumerate() {
                if items[i + 1..].iter().any(|b| a == b) {
                    return Ok(false);
                }
            }
        }

        let mut prefix = 0;
        if let Some(Node::Array(schemas)) = entries.get("prefixItems") {
            for (schema, item) in schemas.iter().zip(items) {
                if !self.validate(schema, item, base)? {
                    return Ok(false);
                }
            }
            prefix = schemas.len();
        }

        if let Some(schema) = entries.get("items") {
            for item in items.iter().skip(prefix) {
                if !self.validate(schema, item, base)? {
                    return Ok(false);
                }
            }
        }

        if let Some(schema) = entries.get("contains") {
            let mut matched = 0usize;
            for item in items {
                if self.validate(schema, item, base)? {
                    matched += 1;
                }
            }
            let min = number_keyword(entries, "minContains").unwrap_or(1.0);
            if (matched as f64) < min {
                return Ok(false);
            }
            if number_keyword(entries, "maxContains").is_some_and(|max| matched as f64 > max) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn validate_object(&mut self, entries: &Object, instance: &Node, base: &Url) -> SchemaResult<bool> {
        let Node::Object(properties) = instance else {
            return Ok(true);
        };
        // Undefined values are absent
        let present: Vec<(&String, &Node)> = properties.iter().filter(|(_, value)| !value.is_undefined()).collect();

        let count = present.len() as f64;
        if number_keyword(entries, "maxProperties").is_some_and(|max| count > max)
            || number_keyword(entries, "minProperties").is_some_and(|min| count < min)
        {
            return Ok(false);
        }

        if let Some(Node::Array(required)) = entries.get("required")
            && !required
                .iter()
                .filter_map(Node::as_str)
                .all(|name| instance.get(name).is_some())
        {
            return Ok(false);
        }

        if let Some(Node::Object(dependencies)) = entries.get("dependentRequired") {
            for (name, required) in dependencies {
                if instance.get(name).is_none() {
                    continue;
                }
                let Node::Array(required) = required else { continue };
                if !required
                    .iter()
                    .filter_map(Node::as_str)
                    .all(|name| instance.get(name).is_some())
                {
                    return Ok(false);
                }
            }
        }

        if let Some(schema) = entries.get("propertyNames") {
            for (name, _) in &present {
                if !self.validate(schema, &Node::String((*name).clone()), base)? {
                    return Ok(false);
                }
            }
        }

        let declared = entries.get("properties").and_then(Node::as_object);
        let patterns = entries.get("patternProperties").and_then(Node::as_object);
        let additional = entries.get("additionalProperties");

        for (name, value) in present {
            let mut evaluated = false;

            if let Some(schema) = declared.and_then(|declared| declared.get(name.as_str())) {
                evaluated = true;
                if !self.validate(schema, value, base)? {
                    return Ok(false);
                }
            }

            if let Some(patterns) = patterns {
                for (pattern, schema) in patterns {
                    if self.pattern(pattern)?.is_match(name) {
                        evaluated = true;
                        if !self.validate(schema, value, base)? {
                            return Ok(false);
                        }
                    }
                }
            }

            if !evaluated
                && let Some(schema) = additional
                && !self.validate(schema, value, base)?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn validate_combinators(&mut self, entries: &Object, instance: &Node, base: &Url) -> SchemaResult<bool> {
        if let Some(Node::Array(schemas)) = entries.get("allOf") {
            for schema in schemas {
                if !self.validate(schema, instance, base)? {
                    return Ok(false);
                }
            }
        }

        if let Some(Node::Array(schemas)) = entries.get("anyOf") {
            let mut any = false;
            for schema in schemas {
                if self.validate(schema, instance, base)? {
                    any = true;
                    break;
                }
            }
            if !any {
                return Ok(false);
            }
        }

        if let Some(Node::Array(schemas)) = entries.get("oneOf") {
            let mut matched = 0;
            for schema in schemas {
                if self.validate(schema, instance, base)? {
                    matched += 1;
                }
            }
            if matched != 1 {
                return Ok(false);
            }
        }

        if let Some(schema) = entries.get("not")
            && self.validate(schema, instance, base)?
        {
            return Ok(false);
        }

        if let Some(condition) = entries.get("if") {
            let branch = if self.validate(condition, instance, base)? {
                entries.get("then")
            } else {
                entries.get("else")
            };
            if let Some(schema) = branch
                && !self.validate(schema, instance, base)?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn pattern(&mut self, pattern: &str) -> SchemaResult<&Regex> {
        if !self.patterns.contains_key(pattern) {
            let regex = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.patterns.insert(pattern.to_string(), regex);
        }
        Ok(&self.patterns[pattern])
    }
}

fn has_type(instance: &Node, name: &str) -> bool {
    match (name, instance) {
        ("null", Node::Null) => true,
        ("boolean", Node::Bool(_)) => true,
        ("number", Node::Number(_)) => true,
        ("integer", Node::Number(n)) => n.is_finite() && n.fract() == 0.0,
        ("string", Node::String(_)) => true,
        ("array", Node::Array(_)) => true,
        ("object", Node::Object(_)) => true,
        _ => false,
    }
}

fn validate_enum(entries: &Object, instance: &Node) -> bool {
    if let Some(expected) = entries.get("const")
        && expected != instance
    {
        return false;
    }
    match entries.get("enum") {
        Some(Node::Array(values)) => values.contains(instance),
        _ => true,
    }
}

fn validate_number(entries: &Object, instance: &Node) -> bool {
    let Node::Number(value) = instance else {
        return true;
    };
    let value = *value;

    if let Some(divisor) = number_keyword(entries, "multipleOf")
        && divisor > 0.0
    {
        let quotient = value / divisor;
        if (quotient - quotient.round()).abs() > 1e-9 {
            return false;
        }
    }

    !(number_keyword(entries, "maximum").is_some_and(|max| value > max)
        || number_keyword(entries, "exclusiveMaximum").is_some_and(|max| value >= max)
        || number_keyword(entries, "minimum").is_some_and(|min| value < min)
        || number_keyword(entries, "exclusiveMinimum").is_some_and(|min| value <= min))
}

fn number_keyword(entries: &Object, keyword: &str) -> Option<f64> {
    entries.get(keyword).and_then(Node::as_f64)
}

/// Check a string against a named format. Unknown formats pass.
pub fn check_format(format: &str, value: &str) -> bool {
    match format {
        "date" => is_date(value),
        "time" => is_time(value),
        "date-time" => value
            .split_once(['T', 't'])
            .is_some_and(|(date, time)| is_date(date) && is_time(time)),
        "email" => EMAIL.is_match(value),
        "hostname" => value.len() <= 253 && HOSTNAME.is_match(value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "uri" => Url::parse(value).is_ok(),
        "uuid" => UUID.is_match(value),
        _ => true,
    }
}

fn is_date(value: &str) -> bool {
    let Some(captures) = DATE.captures(value) else {
        return false;
    };
    let field = |i: usize| captures[i].parse::<u32>().unwrap_or(0);
    let (year, month, day) = (field(1), field(2), field(3));

    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days_in_month).contains(&day)
}

fn is_time(value: &str) -> bool {
    let Some(captures) = TIME.captures(value) else {
        return false;
    };
    let field = |i: usize| captures.get(i).map_or(0, |m| m.as_str().parse::<u32>().unwrap_or(99));
    // Seconds may be 60 for leap seconds
    field(1) < 24 && field(2) < 60 && field(3) <= 60 && field(6) < 24 && field(7) < 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats() {
        assert!(check_format("date", "2024-02-29"));
        assert!(!check_format("date", "2023-02-29"));
        assert!(!check_format("date", "2024-13-01"));
        assert!(check_format("date-time", "2024-01-15T10:30:00Z"));
        assert!(check_format("date-time", "2024-01-15T10:30:00.5+02:00"));
        assert!(!check_format("date-time", "2024-01-15 10:30"));
        assert!(check_format("email", "ada@example.com"));
        assert!(!check_format("email", "not an email"));
        assert!(check_format("ipv4", "192.168.0.1"));
        assert!(!check_format("ipv4", "256.1.1.1"));
        assert!(check_format("uuid", "123e4567-e89b-12d3-a456-426614174000"));
        assert!(check_format("unknown-format", "anything"));
    }

    #[test]
    fn test_integer_type() {
        assert!(has_type(&Node::Number(3.0), "integer"));
        assert!(!has_type(&Node::Number(3.5), "integer"));
        assert!(has_type(&Node::Number(3.5), "number"));
    }
}
