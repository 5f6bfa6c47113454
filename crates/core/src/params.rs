use std::any::Any;
use std::sync::Arc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::param_style::ParamStyle;

/// A single bound value.
///
/// Covers the scalar types every SQL driver accepts plus an `Opaque`
/// escape hatch so callers can pass driver-native values (e.g. a
/// `chrono::NaiveDate`, a `uuid::Uuid`) through the renderer untouched —
/// the core never needs to understand every driver's type system, only
/// carry the value to the cursor's `execute` call.
#[derive(Clone)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(CompactString),
    Bytes(Arc<[u8]>),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Null => f.write_str("Null"),
            ParamValue::Bool(b) => write!(f, "Bool({b})"),
            ParamValue::Int(i) => write!(f, "Int({i})"),
            ParamValue::Float(n) => write!(f, "Float({n})"),
            ParamValue::Text(s) => write!(f, "Text({s:?})"),
            ParamValue::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            ParamValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}
impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}
impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(CompactString::from(v))
    }
}
impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(CompactString::from(v))
    }
}
impl<T> From<Option<T>> for ParamValue
where
    ParamValue: From<T>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => ParamValue::from(v),
            None => ParamValue::Null,
        }
    }
}

/// The accumulator a render pass fills: an ordered insertion log of
/// (emitted-placeholder-name, value) pairs.
///
/// Kept as an ordered insertion log during rendering
/// ([`BoundParams::push`]); [`BoundParams::finish`] converts it to the
/// dialect-appropriate final shape.
#[derive(Debug, Default)]
pub struct BoundParams {
    entries: Vec<(CompactString, ParamValue)>,
}

impl BoundParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bound value, returning its 1-based position (used by
    /// `numeric`/`dollar` placeholders).
    pub fn push(&mut self, name: impl Into<CompactString>, value: ParamValue) -> usize {
        self.entries.push((name.into(), value));
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produce the final parameter collection for `dialect`: a positional
    /// sequence for `qmark`/`numeric`/`format`/`dollar`, a named map (in
    /// insertion order) for `named`/`pyformat`.
    pub fn finish(self, dialect: ParamStyle) -> FinalParams {
        if dialect.is_positional() {
            FinalParams::Positional(self.entries.into_iter().map(|(_, v)| v).collect())
        } else {
            let mut map = IndexMap::with_capacity(self.entries.len());
            for (name, value) in self.entries {
                map.insert(name, value);
            }
            FinalParams::Named(map)
        }
    }
}

/// The bound-parameter collection as handed to a driver's `execute`.
#[derive(Debug, Clone)]
pub enum FinalParams {
    Positional(Vec<ParamValue>),
    Named(IndexMap<CompactString, ParamValue>),
}

impl FinalParams {
    pub fn as_positional(&self) -> Option<&[ParamValue]> {
        match self {
            FinalParams::Positional(v) => Some(v),
            FinalParams::Named(_) => None,
        }
    }

    pub fn as_named(&self) -> Option<&IndexMap<CompactString, ParamValue>> {
        match self {
            FinalParams::Positional(_) => None,
            FinalParams::Named(m) => Some(m),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FinalParams::Positional(v) => v.len(),
            FinalParams::Named(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_dialect_yields_ordered_sequence() {
        let mut bp = BoundParams::new();
        bp.push("a", ParamValue::Int(1));
        bp.push("b", ParamValue::Int(2));
        let out = bp.finish(ParamStyle::Qmark);
        let values = out.as_positional().unwrap();
        assert_eq!(values.len(), 2);
        assert!(matches!(values[0], ParamValue::Int(1)));
        assert!(matches!(values[1], ParamValue::Int(2)));
    }

    #[test]
    fn named_dialect_yields_ordered_map() {
        let mut bp = BoundParams::new();
        bp.push("name", ParamValue::from("a"));
        let out = bp.finish(ParamStyle::PyFormat);
        let map = out.as_named().unwrap();
        assert_eq!(map.len(), 1);
        assert!(matches!(map.get("name"), Some(ParamValue::Text(_))));
    }

    #[test]
    fn push_returns_1_based_position() {
        let mut bp = BoundParams::new();
        assert_eq!(bp.push("x", ParamValue::Null), 1);
        assert_eq!(bp.push("y", ParamValue::Null), 2);
    }
}
