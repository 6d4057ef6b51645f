//! Conversions between data values and JSON documents.

use serde_json::Value;
use strata_core::{Data, Duration, Error, Kind, Pattern, Port, Protocol, Result, Timestamp, Type};
use std::collections::{BTreeMap, BTreeSet};

/// Renders a value as JSON. Scalar vocabulary types render as their textual
/// forms; sets and vectors become arrays, maps become objects keyed by the
/// rendered key.
pub fn data_to_json(data: &Data) -> Value {
    match data {
        Data::None => Value::Null,
        Data::Bool(x) => Value::Bool(*x),
        Data::Integer(x) => Value::from(*x),
        Data::Count(x) => Value::from(*x),
        Data::Real(x) => serde_json::Number::from_f64(x.0)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Duration(x) => Value::from(x.as_secs_f64()),
        Data::Time(x) => Value::from(x.to_string()),
        Data::String(x) => Value::from(x.clone()),
        Data::Pattern(x) => Value::from(x.to_string()),
        Data::Address(x) => Value::from(x.to_string()),
        Data::Subnet(x) => Value::from(x.to_string()),
        Data::Port(x) => Value::from(x.to_string()),
        Data::Enumeration(x) => Value::from(*x),
        Data::Vector(xs) => Value::Array(xs.iter().map(data_to_json).collect()),
        Data::Set(xs) => Value::Array(xs.iter().map(data_to_json).collect()),
        Data::Map(xs) => Value::Object(
            xs.iter()
                .map(|(k, v)| (k.to_string(), data_to_json(v)))
                .collect(),
        ),
        Data::Record(xs) => Value::Array(xs.iter().map(data_to_json).collect()),
    }
}

/// Converts a JSON value into a data value of the given type. `null` maps
/// to `Data::None` for every type.
pub fn json_to_data(ty: &Type, value: &Value) -> Result<Data> {
    if value.is_null() {
        return Ok(Data::None);
    }
    let ty = ty.skeleton();
    let Some(kind) = ty.kind() else {
        return Err(Error::inconsistent_schema(
            "cannot convert JSON into the empty type",
        ));
    };
    let fail = || Error::inconsistent_schema(format!("JSON value {value} does not fit type {ty}"));
    match kind {
        Kind::None => Err(fail()),
        Kind::Bool => value.as_bool().map(Data::Bool).ok_or_else(fail),
        Kind::Integer => value.as_i64().map(Data::Integer).ok_or_else(fail),
        Kind::Count => value.as_u64().map(Data::Count).ok_or_else(fail),
        Kind::Real => value.as_f64().map(Data::real).ok_or_else(fail),
        Kind::Duration => value
            .as_f64()
            .map(|secs| Data::Duration(Duration::from_secs_f64(secs)))
            .ok_or_else(fail),
        Kind::Time => {
            if let Some(secs) = value.as_f64() {
                return Ok(Data::Time(Timestamp::from_secs_f64(secs)));
            }
            let text = value.as_str().ok_or_else(fail)?;
            let parsed = chrono::DateTime::parse_from_rfc3339(text).map_err(|_| fail())?;
            let nanos = parsed.timestamp_nanos_opt().ok_or_else(fail)?;
            Ok(Data::Time(Timestamp::from_nanos(nanos)))
        }
        Kind::String => value
            .as_str()
            .map(|s| Data::String(s.to_string()))
            .ok_or_else(fail),
        Kind::Pattern => {
            let text = value.as_str().ok_or_else(fail)?;
            let pattern = text
                .parse::<Pattern>()
                .unwrap_or_else(|_| Pattern::new(text));
            Ok(Data::Pattern(pattern))
        }
        Kind::Address => {
            let text = value.as_str().ok_or_else(fail)?;
            text.parse().map(Data::Address).map_err(|_| fail())
        }
        Kind::Subnet => {
            let text = value.as_str().ok_or_else(fail)?;
            text.parse().map(Data::Subnet).map_err(|_| fail())
        }
        Kind::Port => {
            if let Some(number) = value.as_u64() {
                let number = u16::try_from(number).map_err(|_| fail())?;
                return Ok(Data::Port(Port::new(number, Protocol::Unknown)));
            }
            let text = value.as_str().ok_or_else(fail)?;
            text.parse().map(Data::Port).map_err(|_| fail())
        }
        Kind::Enumeration(fields) => {
            if let Some(index) = value.as_u64() {
                if (index as usize) < fields.len() {
                    return Ok(Data::Enumeration(index as u32));
                }
                return Err(fail());
            }
            let text = value.as_str().ok_or_else(fail)?;
            fields
                .iter()
                .position(|f| f == text)
                .map(|i| Data::Enumeration(i as u32))
                .ok_or_else(fail)
        }
        Kind::Vector(element) => {
            let xs = value.as_array().ok_or_else(fail)?;
            let converted: Result<Vec<_>> = xs.iter().map(|x| json_to_data(element, x)).collect();
            Ok(Data::Vector(converted?))
        }
        Kind::Set(element) => {
            let xs = value.as_array().ok_or_else(fail)?;
            let converted: Result<BTreeSet<_>> =
                xs.iter().map(|x| json_to_data(element, x)).collect();
            Ok(Data::Set(converted?))
        }
        Kind::Map(key, value_ty) => {
            let object = value.as_object().ok_or_else(fail)?;
            let mut out = BTreeMap::new();
            for (k, v) in object {
                let k = json_to_data(key, &Value::from(k.clone()))?;
                let v = json_to_data(value_ty, v)?;
                out.insert(k, v);
            }
            Ok(Data::Map(out))
        }
        Kind::Record(fields) => {
            if let Some(xs) = value.as_array() {
                if xs.len() != fields.len() {
                    return Err(fail());
                }
                let converted: Result<Vec<_>> = fields
                    .iter()
                    .zip(xs.iter())
                    .map(|(field, x)| json_to_data(&field.ty, x))
                    .collect();
                return Ok(Data::Record(converted?));
            }
            let object = value.as_object().ok_or_else(fail)?;
            let converted: Result<Vec<_>> = fields
                .iter()
                .map(|field| match object.get(&field.name) {
                    Some(x) => json_to_data(&field.ty, x),
                    None => Ok(Data::None),
                })
                .collect();
            Ok(Data::Record(converted?))
        }
        Kind::Alias(_) => unreachable!("skeleton unwraps aliases"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        assert_eq!(
            json_to_data(&Type::count(), &serde_json::json!(42)).unwrap(),
            Data::Count(42)
        );
        assert_eq!(
            json_to_data(&Type::address(), &serde_json::json!("10.0.0.1")).unwrap(),
            Data::Address("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            json_to_data(&Type::port(), &serde_json::json!(443)).unwrap(),
            Data::Port(Port::new(443, Protocol::Unknown))
        );
        assert_eq!(
            json_to_data(&Type::boolean(), &serde_json::json!(null)).unwrap(),
            Data::None
        );
        assert!(json_to_data(&Type::boolean(), &serde_json::json!(3)).is_err());
    }

    #[test]
    fn enumerations_accept_names_and_indexes() {
        let e = Type::enumeration(["allow", "deny"]);
        assert_eq!(
            json_to_data(&e, &serde_json::json!("deny")).unwrap(),
            Data::Enumeration(1)
        );
        assert_eq!(
            json_to_data(&e, &serde_json::json!(0)).unwrap(),
            Data::Enumeration(0)
        );
        assert!(json_to_data(&e, &serde_json::json!("drop")).is_err());
    }

    #[test]
    fn containers_convert_elementwise() {
        let v = json_to_data(
            &Type::vector(Type::integer()),
            &serde_json::json!([1, 2, 3]),
        )
        .unwrap();
        assert_eq!(
            v,
            Data::Vector(vec![Data::Integer(1), Data::Integer(2), Data::Integer(3)])
        );
        let rendered = data_to_json(&v);
        assert_eq!(rendered, serde_json::json!([1, 2, 3]));
    }
}
