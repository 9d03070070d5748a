//! Built-in helper functions (spec §4.3: the complete `toNumber`…
//! `base64Decode` list). Each takes already-evaluated [`Value`] arguments;
//! arity and type mismatches surface as [`ExpressionError`].

use base64::Engine;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use flowcore_core::Value;
use rand::Rng;

use crate::error::{ExpressionError, ExpressionResult};

pub fn call(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    match name {
        "toNumber" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)?))),
        "toString" => arity1(name, args).map(|v| Value::String(as_string(v))),
        "toInt" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)? as i64))),
        "toBoolean" => arity1(name, args).map(|v| Value::Bool(as_bool(v))),
        "toDate" => arity1(name, args).and_then(|v| parse_date(&as_string(v)).map(date_to_value)),

        "toUpper" => arity1(name, args).map(|v| Value::String(as_string(v).to_uppercase())),
        "toLower" => arity1(name, args).map(|v| Value::String(as_string(v).to_lowercase())),
        "trim" => arity1(name, args).map(|v| Value::String(as_string(v).trim().to_string())),
        "substring" => substring(name, args),
        "replace" => replace(name, args),
        "split" => split(name, args),
        "contains" => binary_str(name, args, |h, n| h.contains(n)),
        "startsWith" => binary_str(name, args, |h, n| h.starts_with(n)),
        "endsWith" => binary_str(name, args, |h, n| h.ends_with(n)),
        "length" => length(name, args),
        "regexMatch" => regex_match(name, args),

        "round" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)?.round()))),
        "floor" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)?.floor()))),
        "ceil" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)?.ceil()))),
        "abs" => arity1(name, args).and_then(|v| Ok(Value::from(as_number(v)?.abs()))),
        "min" => variadic_number(name, args, f64::min, f64::INFINITY),
        "max" => variadic_number(name, args, f64::max, f64::NEG_INFINITY),
        "random" => {
            expect_arity(name, args, 0..=0)?;
            Ok(Value::from(rand::thread_rng().gen::<f64>()))
        }

        "now" => {
            expect_arity(name, args, 0..=0)?;
            Ok(Value::String(Utc::now().to_rfc3339()))
        }
        "utcNow" => {
            expect_arity(name, args, 0..=0)?;
            Ok(Value::String(Utc::now().to_rfc3339()))
        }
        "today" => {
            expect_arity(name, args, 0..=0)?;
            Ok(Value::String(Utc::now().date_naive().to_string()))
        }
        "formatDate" => format_date(name, args),
        "addDays" => add_duration(name, args, ChronoDuration::days),
        "addHours" => add_duration(name, args, ChronoDuration::hours),
        "addMinutes" => add_duration(name, args, ChronoDuration::minutes),
        "year" => date_part(name, args, |d| d.year() as i64),
        "month" => date_part(name, args, |d| d.month() as i64),
        "day" => date_part(name, args, |d| d.day() as i64),

        "parseJson" => {
            let v = arity1(name, args)?;
            serde_json::from_str(&as_string(v))
                .map_err(|e| ExpressionError::TypeError(format!("parseJson: {e}")))
        }
        "toJson" => {
            let v = arity1(name, args)?;
            Ok(Value::String(serde_json::to_string(v).unwrap_or_default()))
        }
        "getJsonProperty" => get_json_property(name, args),

        "isEmpty" => arity1(name, args).map(|v| Value::Bool(is_empty(v))),
        "isNull" => arity1(name, args).map(|v| Value::Bool(v.is_null())),
        "arrayLength" => arity1(name, args).and_then(|v| match v {
            Value::Array(items) => Ok(Value::from(items.len() as i64)),
            other => Err(ExpressionError::TypeError(format!(
                "arrayLength expects an array, got {other}"
            ))),
        }),
        "defaultValue" => {
            expect_arity(name, args, 2..=2)?;
            if args[0].is_null() {
                Ok(args[1].clone())
            } else {
                Ok(args[0].clone())
            }
        }
        "uuid" => {
            expect_arity(name, args, 0..=0)?;
            Ok(Value::String(uuid::Uuid::new_v4().to_string()))
        }
        "base64Encode" => {
            let v = arity1(name, args)?;
            Ok(Value::String(
                base64::engine::general_purpose::STANDARD.encode(as_string(v)),
            ))
        }
        "base64Decode" => {
            let v = arity1(name, args)?;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(as_string(v))
                .map_err(|e| ExpressionError::TypeError(format!("base64Decode: {e}")))?;
            String::from_utf8(decoded)
                .map(Value::String)
                .map_err(|e| ExpressionError::TypeError(format!("base64Decode: {e}")))
        }

        other => Err(ExpressionError::UnknownFunction(other.to_string())),
    }
}

fn expect_arity(
    name: &str,
    args: &[Value],
    range: std::ops::RangeInclusive<usize>,
) -> ExpressionResult<()> {
    if range.contains(&args.len()) {
        Ok(())
    } else {
        Err(ExpressionError::ArityMismatch {
            name: name.to_string(),
            expected: if range.start() == range.end() {
                range.start().to_string()
            } else {
                format!("{}..{}", range.start(), range.end())
            },
            actual: args.len(),
        })
    }
}

fn arity1<'a>(name: &str, args: &'a [Value]) -> ExpressionResult<&'a Value> {
    expect_arity(name, args, 1..=1)?;
    Ok(&args[0])
}

fn as_number(v: &Value) -> ExpressionResult<f64> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExpressionError::TypeError("number out of range".into())),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ExpressionError::TypeError(format!("cannot convert '{s}' to a number"))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(ExpressionError::TypeError(format!(
            "cannot convert {other} to a number"
        ))),
    }
}

fn as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn substring(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=3)?;
    let s = as_string(&args[0]);
    let start = as_number(&args[1])? as usize;
    let chars: Vec<char> = s.chars().collect();
    let end = if args.len() == 3 {
        (as_number(&args[2])? as usize).min(chars.len())
    } else {
        chars.len()
    };
    let start = start.min(end);
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn replace(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 3..=3)?;
    let s = as_string(&args[0]);
    let from = as_string(&args[1]);
    let to = as_string(&args[2]);
    Ok(Value::String(s.replace(&from, &to)))
}

fn split(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    let s = as_string(&args[0]);
    let sep = as_string(&args[1]);
    let parts: Vec<Value> = s.split(&sep as &str).map(|p| Value::String(p.to_string())).collect();
    Ok(Value::Array(parts))
}

fn binary_str(
    name: &str,
    args: &[Value],
    f: impl Fn(&str, &str) -> bool,
) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    Ok(Value::Bool(f(&as_string(&args[0]), &as_string(&args[1]))))
}

fn length(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    let v = arity1(name, args)?;
    let len = match v {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(ExpressionError::TypeError(format!(
                "length is not defined for {other}"
            )))
        }
    };
    Ok(Value::from(len as i64))
}

fn regex_match(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    let haystack = as_string(&args[0]);
    let pattern = as_string(&args[1]);
    let re = regex::Regex::new(&pattern)
        .map_err(|e| ExpressionError::TypeError(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Value::Bool(re.is_match(&haystack)))
}

fn variadic_number(
    name: &str,
    args: &[Value],
    reducer: impl Fn(f64, f64) -> f64,
    identity: f64,
) -> ExpressionResult<Value> {
    if args.is_empty() {
        return Err(ExpressionError::ArityMismatch {
            name: name.to_string(),
            expected: "1..".to_string(),
            actual: 0,
        });
    }
    let mut acc = identity;
    for a in args {
        acc = reducer(acc, as_number(a)?);
    }
    Ok(Value::from(acc))
}

fn parse_date(s: &str) -> ExpressionResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ExpressionError::TypeError(format!("cannot parse date '{s}': {e}")))
}

fn date_to_value(dt: DateTime<Utc>) -> Value {
    Value::String(dt.to_rfc3339())
}

fn format_date(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    let dt = parse_date(&as_string(&args[0]))?;
    let fmt = as_string(&args[1]);
    Ok(Value::String(dt.format(&fmt).to_string()))
}

fn add_duration(
    name: &str,
    args: &[Value],
    make: impl Fn(i64) -> ChronoDuration,
) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    let dt = parse_date(&as_string(&args[0]))?;
    let amount = as_number(&args[1])? as i64;
    Ok(date_to_value(dt + make(amount)))
}

fn date_part(name: &str, args: &[Value], extract: impl Fn(DateTime<Utc>) -> i64) -> ExpressionResult<Value> {
    let v = arity1(name, args)?;
    let dt = parse_date(&as_string(v))?;
    Ok(Value::from(extract(dt)))
}

fn get_json_property(name: &str, args: &[Value]) -> ExpressionResult<Value> {
    expect_arity(name, args, 2..=2)?;
    let path = as_string(&args[1]);
    let mut current = &args[0];
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = current
            .get(segment)
            .ok_or_else(|| ExpressionError::TypeError(format!("no property '{segment}' in value")))?;
    }
    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_upper_and_lower() {
        assert_eq!(
            call("toUpper", &[Value::String("hi".into())]).unwrap(),
            Value::String("HI".into())
        );
        assert_eq!(
            call("toLower", &[Value::String("HI".into())]).unwrap(),
            Value::String("hi".into())
        );
    }

    #[test]
    fn arithmetic_helpers() {
        assert_eq!(call("round", &[Value::from(1.6)]).unwrap(), Value::from(2.0));
        assert_eq!(call("floor", &[Value::from(1.6)]).unwrap(), Value::from(1.0));
        assert_eq!(call("abs", &[Value::from(-4.0)]).unwrap(), Value::from(4.0));
        assert_eq!(
            call("max", &[Value::from(1.0), Value::from(9.0), Value::from(3.0)]).unwrap(),
            Value::from(9.0)
        );
    }

    #[test]
    fn string_predicates() {
        assert_eq!(
            call("contains", &[Value::String("hello".into()), Value::String("ell".into())]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("startsWith", &[Value::String("hello".into()), Value::String("he".into())]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn default_value_falls_back_on_null() {
        assert_eq!(
            call("defaultValue", &[Value::Null, Value::from(7)]).unwrap(),
            Value::from(7)
        );
        assert_eq!(
            call("defaultValue", &[Value::from(3), Value::from(7)]).unwrap(),
            Value::from(3)
        );
    }

    #[test]
    fn base64_roundtrip() {
        let encoded = call("base64Encode", &[Value::String("hello".into())]).unwrap();
        assert_eq!(encoded, Value::String("aGVsbG8=".into()));
        let decoded = call("base64Decode", &[encoded]).unwrap();
        assert_eq!(decoded, Value::String("hello".into()));
    }

    #[test]
    fn unknown_function_errors() {
        assert!(matches!(
            call("doesNotExist", &[]),
            Err(ExpressionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn get_json_property_walks_dotted_path() {
        let obj = serde_json::json!({"a": {"b": {"c": 42}}});
        let result = call("getJsonProperty", &[obj, Value::String("a.b.c".into())]).unwrap();
        assert_eq!(result, Value::from(42));
    }

    #[test]
    fn is_empty_and_is_null() {
        assert_eq!(call("isEmpty", &[Value::String(String::new())]).unwrap(), Value::Bool(true));
        assert_eq!(call("isNull", &[Value::Null]).unwrap(), Value::Bool(true));
        assert_eq!(call("isNull", &[Value::from(1)]).unwrap(), Value::Bool(false));
    }
}
