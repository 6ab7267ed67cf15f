// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-based filter patterns
//!
//! A pattern is parsed once from its JSON form into a typed tree:
//!   - interior nodes map field names to sub-patterns
//!   - leaves are a list of alternatives, any of which may match
//!
//! Supported alternatives are literals, `{"exists": bool}`,
//! `{"anything-but": ...}` and `{"prefix": "..."}`. Every other operator is
//! kept as [`Alternative::Unsupported`] and makes evaluation fail with
//! [`MatchError::UnsupportedOperator`].
//!
//! Absence policy: a field holding JSON `null` counts as absent for `exists`,
//! while a literal `null` alternative matches a field explicitly set to `null`.

use crate::entry::EventEntry;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

const EXISTS: &str = "exists";
const ANYTHING_BUT: &str = "anything-but";
const PREFIX: &str = "prefix";

/// Operators EventBridge defines that this matcher does not implement
const UNSUPPORTED_OPERATORS: &[&str] = &[
    "numeric",
    "cidr",
    "suffix",
    "equals-ignore-case",
    "wildcard",
];

/// Errors raised while evaluating a pattern
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("unsupported filter operator `{operator}` on `{path}`")]
    UnsupportedOperator { operator: String, path: String },
}

/// Errors raised while parsing a pattern
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("pattern must be a JSON object, got {0}")]
    NotAnObject(String),
    #[error("`{field}` must be a literal, a list or an operator object")]
    InvalidLeaf { field: String },
    #[error("operator `{operator}` on `{field}` has an invalid operand: {operand}")]
    InvalidOperand {
        field: String,
        operator: String,
        operand: String,
    },
}

/// One way a field value can satisfy a leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Alternative {
    Scalar(Value),
    Exists(bool),
    AnythingBut(Vec<Alternative>),
    Prefix(String),
    Unsupported(String),
}

/// A list of alternatives (logical OR)
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf(pub Vec<Alternative>);

/// A node in the detail pattern tree
#[derive(Debug, Clone, PartialEq)]
pub enum PatternNode {
    Leaf(Leaf),
    Fields(BTreeMap<String, PatternNode>),
}

/// A parsed subscription pattern
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPattern {
    pub source: Option<Leaf>,
    pub detail_type: Option<Leaf>,
    pub resources: Option<Leaf>,
    pub detail: Option<BTreeMap<String, PatternNode>>,
    /// Top-level keys this matcher does not filter on
    pub ignored_fields: Vec<String>,
}

impl FilterPattern {
    /// Parse the JSON form of a pattern
    pub fn parse(value: &Value) -> Result<Self, PatternError> {
        let Value::Object(map) = value else {
            return Err(PatternError::NotAnObject(kind(value).to_string()));
        };

        let mut pattern = FilterPattern::default();
        for (key, value) in map {
            match key.as_str() {
                "source" => pattern.source = Some(parse_leaf(key, value)?),
                "detail-type" => pattern.detail_type = Some(parse_leaf(key, value)?),
                "resources" => pattern.resources = Some(parse_leaf(key, value)?),
                "detail" => {
                    let Value::Object(fields) = value else {
                        return Err(PatternError::InvalidLeaf {
                            field: key.clone(),
                        });
                    };
                    pattern.detail = Some(parse_fields("detail", fields)?);
                }
                other => pattern.ignored_fields.push(other.to_string()),
            }
        }
        Ok(pattern)
    }

    /// All unsupported operators in the pattern, with the path they sit on
    pub fn unsupported_operators(&self) -> Vec<(String, String)> {
        let mut found = Vec::new();
        let top = [
            ("source", &self.source),
            ("detail-type", &self.detail_type),
            ("resources", &self.resources),
        ];
        for (path, leaf) in top {
            if let Some(leaf) = leaf {
                leaf.collect_unsupported(path, &mut found);
            }
        }
        if let Some(detail) = &self.detail {
            for (path, leaf) in flatten_pattern(detail) {
                leaf.collect_unsupported(&format!("detail.{}", path), &mut found);
            }
        }
        found
    }

    /// Check every dimension the pattern declares against an entry.
    ///
    /// `detail-type` is only checked when the entry carries one, and
    /// `detail` only when the entry has a body.
    pub fn matches_entry(&self, entry: &EventEntry) -> Result<bool, MatchError> {
        if let Some((path, operator)) = self.unsupported_operators().into_iter().next() {
            return Err(MatchError::UnsupportedOperator { operator, path });
        }

        if let Some(leaf) = &self.source {
            let source = Value::String(entry.source.clone());
            if !leaf.evaluate(Some(&source), "source")? {
                return Ok(false);
            }
        }

        if let (Some(leaf), Some(detail_type)) = (&self.detail_type, &entry.detail_type) {
            let detail_type = Value::String(detail_type.clone());
            if !leaf.evaluate(Some(&detail_type), "detail-type")? {
                return Ok(false);
            }
        }

        if let Some(leaf) = &self.resources {
            let resources = Value::Array(
                entry
                    .resources
                    .iter()
                    .map(|r| Value::String(r.clone()))
                    .collect(),
            );
            if !leaf.evaluate(Some(&resources), "resources")? {
                return Ok(false);
            }
        }

        if let (Some(fields), Some(body)) = (&self.detail, &entry.detail) {
            let Ok(detail) = serde_json::from_str::<Value>(body) else {
                tracing::debug!(source = %entry.source, "detail is not valid JSON, detail filter fails");
                return Ok(false);
            };
            let flat = flatten(&detail);
            for (path, leaf) in flatten_pattern(fields) {
                if !leaf.evaluate(flat.get(&path), &path)? {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

impl Leaf {
    /// OR across alternatives, stopping at the first match
    pub fn evaluate(&self, field: Option<&Value>, path: &str) -> Result<bool, MatchError> {
        any_matches(&self.0, field, path)
    }

    fn collect_unsupported(&self, path: &str, found: &mut Vec<(String, String)>) {
        collect_unsupported(&self.0, path, found);
    }
}

impl Alternative {
    pub fn evaluate(&self, field: Option<&Value>, path: &str) -> Result<bool, MatchError> {
        match self {
            Alternative::Scalar(expected) => Ok(match field {
                None => false,
                Some(Value::Array(items)) => items.iter().any(|item| scalar_eq(item, expected)),
                Some(value) => scalar_eq(value, expected),
            }),
            Alternative::Exists(wanted) => Ok(is_present(field) == *wanted),
            Alternative::AnythingBut(inner) => Ok(!any_matches(inner, field, path)?),
            Alternative::Prefix(prefix) => {
                Ok(matches!(field, Some(Value::String(s)) if s.starts_with(prefix.as_str())))
            }
            Alternative::Unsupported(operator) => Err(MatchError::UnsupportedOperator {
                operator: operator.clone(),
                path: path.to_string(),
            }),
        }
    }
}

fn any_matches(
    alternatives: &[Alternative],
    field: Option<&Value>,
    path: &str,
) -> Result<bool, MatchError> {
    for alternative in alternatives {
        if alternative.evaluate(field, path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_unsupported(alternatives: &[Alternative], path: &str, found: &mut Vec<(String, String)>) {
    for alternative in alternatives {
        match alternative {
            Alternative::Unsupported(operator) => found.push((path.to_string(), operator.clone())),
            Alternative::AnythingBut(inner) => collect_unsupported(inner, path, found),
            _ => {}
        }
    }
}

fn is_present(field: Option<&Value>) -> bool {
    matches!(field, Some(value) if !value.is_null())
}

fn scalar_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

/// Flatten nested objects into dot-separated paths.
///
/// Only objects are recursed into; arrays and scalars are leaves. An empty
/// object contributes no keys.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = join(prefix, key);
        match value {
            Value::Object(inner) => flatten_into(inner, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Flatten a detail pattern tree into (path, leaf) pairs
pub fn flatten_pattern(fields: &BTreeMap<String, PatternNode>) -> Vec<(String, &Leaf)> {
    let mut out = Vec::new();
    flatten_pattern_into(fields, "", &mut out);
    out
}

fn flatten_pattern_into<'a>(
    fields: &'a BTreeMap<String, PatternNode>,
    prefix: &str,
    out: &mut Vec<(String, &'a Leaf)>,
) {
    for (key, node) in fields {
        let path = join(prefix, key);
        match node {
            PatternNode::Leaf(leaf) => out.push((path, leaf)),
            PatternNode::Fields(inner) => flatten_pattern_into(inner, &path, out),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn parse_fields(
    path: &str,
    fields: &Map<String, Value>,
) -> Result<BTreeMap<String, PatternNode>, PatternError> {
    let mut out = BTreeMap::new();
    for (key, value) in fields {
        let field = join(path, key);
        let node = match value {
            Value::Object(inner) if !is_operator_object(inner) => {
                PatternNode::Fields(parse_fields(&field, inner)?)
            }
            _ => PatternNode::Leaf(parse_leaf(&field, value)?),
        };
        out.insert(key.clone(), node);
    }
    Ok(out)
}

/// An object outside a list is an operator only when its single key names one
fn is_operator_object(map: &Map<String, Value>) -> bool {
    map.len() == 1
        && map.keys().all(|k| {
            k == EXISTS || k == ANYTHING_BUT || k == PREFIX || UNSUPPORTED_OPERATORS.contains(&k.as_str())
        })
}

fn parse_leaf(field: &str, value: &Value) -> Result<Leaf, PatternError> {
    match value {
        Value::Array(items) => Ok(Leaf(parse_alternatives(field, items)?)),
        Value::Object(map) if is_operator_object(map) => Ok(Leaf(vec![parse_operator(field, map)?])),
        Value::Object(_) => Err(PatternError::InvalidLeaf {
            field: field.to_string(),
        }),
        scalar => Ok(Leaf(vec![Alternative::Scalar(scalar.clone())])),
    }
}

/// Inside a list every object is an operator object
fn parse_alternatives(field: &str, items: &[Value]) -> Result<Vec<Alternative>, PatternError> {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => parse_operator(field, map),
            Value::Array(_) => Err(PatternError::InvalidLeaf {
                field: field.to_string(),
            }),
            scalar => Ok(Alternative::Scalar(scalar.clone())),
        })
        .collect()
}

fn parse_operator(field: &str, map: &Map<String, Value>) -> Result<Alternative, PatternError> {
    let mut entries = map.iter();
    let (operator, operand) = match (entries.next(), entries.next()) {
        (Some(single), None) => single,
        _ => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Ok(Alternative::Unsupported(format!("{{{}}}", keys.join(","))));
        }
    };

    let invalid = || PatternError::InvalidOperand {
        field: field.to_string(),
        operator: operator.clone(),
        operand: operand.to_string(),
    };

    match operator.as_str() {
        EXISTS => operand.as_bool().map(Alternative::Exists).ok_or_else(invalid),
        PREFIX => operand
            .as_str()
            .map(|p| Alternative::Prefix(p.to_string()))
            .ok_or_else(invalid),
        ANYTHING_BUT => {
            let inner = match operand {
                Value::Array(items) => parse_alternatives(field, items)?,
                Value::Object(inner) => vec![parse_operator(field, inner)?],
                scalar => vec![Alternative::Scalar(scalar.clone())],
            };
            Ok(Alternative::AnythingBut(inner))
        }
        other => Ok(Alternative::Unsupported(other.to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
