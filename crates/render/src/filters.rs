//! The four template filters every rendered expression must end in,
//! grounded on `renderer.py`'s `bind`/`bind_in_clause`/
//! `build_escape_identifier_filter` and `sql_safe`.

use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind};

use sqlkit_core::{quote_identifier, ParamValue};

use crate::state::SharedRenderState;

/// Exact wording of the `inclause`/`identifier` rejection messages,
/// shared with [`crate::renderer`] so a render failure can be routed
/// back to its dedicated `TemplateError` variant instead of the generic
/// render-failure one.
pub(crate) const INCLAUSE_NOT_ITERABLE_MSG: &str = "`inclause` filter requires an iterable value";
pub(crate) const IDENTIFIER_NOT_STRING_OR_ITERABLE_MSG: &str = "`identifier` filter requires a string or iterable of strings";

/// Register `bind`, `inclause`, `identifier`, and `sqlsafe` on `env`,
/// all closing over the same per-render `state`.
pub fn install(env: &mut Environment<'static>, state: SharedRenderState) {
    {
        let state = state.clone();
        env.add_filter("bind", move |value: Value, name: Option<String>| {
            // A value already marked safe came out of `identifier`,
            // `inclause`, or `sqlsafe` upstream in the same expression;
            // binding it again would turn pre-quoted SQL text into a
            // literal parameter instead of leaving it spliced in.
            if value.is_safe() {
                return Ok(value);
            }
            let name = name.unwrap_or_else(|| "param".to_string());
            let param = to_param_value(&value);
            let mut guard = state.lock().unwrap();
            let placeholder = guard.bind_one(&name, param);
            Ok(Value::from_safe_string(placeholder))
        });
    }
    {
        let state = state.clone();
        env.add_filter("inclause", move |value: Value, name: Option<String>| {
            inclause_filter(&state, value, name)
        });
    }
    {
        let state = state.clone();
        env.add_filter("identifier", move |value: Value| identifier_filter(&state, value));
    }
    env.add_filter("sqlsafe", |value: Value| {
        Ok(Value::from_safe_string(stringify(&value)))
    });
}

fn inclause_filter(state: &SharedRenderState, value: Value, name: Option<String>) -> Result<Value, Error> {
    let base_name = name.unwrap_or_else(|| "param".to_string());
    if !matches!(value.kind(), ValueKind::Seq) {
        return Err(Error::new(ErrorKind::InvalidOperation, INCLAUSE_NOT_ITERABLE_MSG));
    }
    // An empty sequence yields bare `()`, which is invalid SQL on its
    // own; that's intentional and left for the caller to guard against,
    // not validated here.
    let items: Vec<Value> = value.try_iter()?.collect();
    let mut guard = state.lock().unwrap();
    let mut placeholders = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let item_name = format!("{base_name}_{i}");
        let param = to_param_value(&item);
        placeholders.push(guard.bind_one(&item_name, param));
    }
    Ok(Value::from_safe_string(format!("({})", placeholders.join(","))))
}

fn identifier_filter(state: &SharedRenderState, value: Value) -> Result<Value, Error> {
    let quote = state.lock().unwrap().quote_char;
    let segments: Vec<String> = match value.kind() {
        ValueKind::String => vec![value.as_str().unwrap_or_default().to_string()],
        ValueKind::Seq => value
            .try_iter()?
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| stringify(&v)))
            .collect(),
        _ => return Err(Error::new(ErrorKind::InvalidOperation, IDENTIFIER_NOT_STRING_OR_ITERABLE_MSG)),
    };
    let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
    let safe = quote_identifier(quote, refs);
    Ok(Value::from_safe_string(safe.as_str().to_string()))
}

fn to_param_value(value: &Value) -> ParamValue {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => ParamValue::Null,
        ValueKind::Bool => ParamValue::Bool(value.is_true()),
        ValueKind::Number => {
            if let Ok(i) = i64::try_from(value.clone()) {
                ParamValue::Int(i)
            } else {
                f64::try_from(value.clone()).map(ParamValue::Float).unwrap_or(ParamValue::Null)
            }
        }
        ValueKind::String => ParamValue::Text(value.as_str().unwrap_or_default().into()),
        ValueKind::Bytes => ParamValue::Bytes(value.as_bytes().unwrap_or_default().into()),
        _ => ParamValue::Text(stringify(value).into()),
    }
}

fn stringify(value: &Value) -> String {
    value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string())
}
