//! Response normalization
//!
//! The only place that looks into raw listing responses. Everything past this
//! module works on [`NormalizedResource`].

use super::registry::{ResourceDef, TagConvention};
use super::{NormalizedResource, Tags};
use crate::error::ScanError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Follow `def.response_path` into `response` and return the listed items.
///
/// A sequence met on the way is descended element-wise and flattened, so
/// `["Reservations", "Instances"]` yields the instances of every reservation.
/// A missing field or a terminal value that is not a sequence means the
/// descriptor does not fit the response.
pub fn resolve_path<'a>(def: &ResourceDef, response: &'a Value) -> Result<Vec<&'a Value>, ScanError> {
    let defect = |segment: &str| ScanError::PathResolution {
        kind: def.kind.clone(),
        path: def.response_path.clone(),
        segment: segment.to_string(),
    };

    let mut current = vec![response];

    for segment in &def.response_path {
        let mut next = Vec::with_capacity(current.len());
        for value in current {
            match value {
                Value::Array(items) => {
                    for item in items {
                        next.push(item.get(segment).ok_or_else(|| defect(segment))?);
                    }
                }
                _ => next.push(value.get(segment).ok_or_else(|| defect(segment))?),
            }
        }
        current = next;
    }

    let last = def.response_path.last().map(String::as_str).unwrap_or("");
    let mut items = Vec::new();
    for value in current {
        match value {
            Value::Array(elements) => items.extend(elements.iter()),
            _ => return Err(defect(last)),
        }
    }

    Ok(items)
}

/// Project one listed item into a [`NormalizedResource`]
pub fn project(def: &ResourceDef, item: &Value) -> Result<NormalizedResource, ScanError> {
    let id = item
        .get(&def.deletion_key)
        .and_then(scalar_string)
        .ok_or_else(|| ScanError::MissingField {
            kind: def.kind.clone(),
            field: def.deletion_key.clone(),
        })?;

    let tags = extract_tags(&def.tags, item);
    let created_at = def
        .created_field
        .as_deref()
        .and_then(|field| item.get(field))
        .and_then(parse_timestamp);

    let mut attributes = match item {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    attributes.remove(&def.deletion_key);
    if let Some(field) = tag_field(&def.tags) {
        attributes.remove(field);
    }

    Ok(NormalizedResource {
        kind: def.kind.clone(),
        id,
        tags,
        created_at,
        attributes,
    })
}

/// Tags of `item` according to the type's convention.
///
/// AWS omits empty tag lists, so a missing tag field is an empty map.
pub fn extract_tags(convention: &TagConvention, item: &Value) -> Tags {
    match convention {
        TagConvention::None => Tags::new(),
        TagConvention::KeyValueList {
            field,
            key_field,
            value_field,
        } => tags_from_list(item.get(field), key_field, value_field),
        TagConvention::Map { field } => item
            .get(field)
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| scalar_string(v).map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Convert `[{key_field: k, value_field: v}, ...]` into a map
pub fn tags_from_list(list: Option<&Value>, key_field: &str, value_field: &str) -> Tags {
    list.and_then(|v| v.as_array())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let key = pair.get(key_field)?.as_str()?;
                    let value = pair
                        .get(value_field)
                        .and_then(scalar_string)
                        .unwrap_or_default();
                    Some((key.to_string(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// RFC 3339 string or epoch seconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let nanos = (secs.fract() * 1e9) as u32;
            Utc.timestamp_opt(secs.trunc() as i64, nanos).single()
        }
        _ => None,
    }
}

fn tag_field(convention: &TagConvention) -> Option<&str> {
    match convention {
        TagConvention::None => None,
        TagConvention::KeyValueList { field, .. } | TagConvention::Map { field } => {
            Some(field.as_str())
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
