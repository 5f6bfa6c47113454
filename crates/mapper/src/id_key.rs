//! Identity-key values: the subset of [`ParamValue`] that can serve as a
//! primary-key component (must be `Eq + Hash`), used as the key of an
//! identity map from identity-key tuple to the unique live object for
//! that key.

use smallvec::SmallVec;
use sqlkit_core::{MappingSpecError, ParamValue};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdScalar {
    Null,
    Bool(bool),
    Int(i64),
    Text(compact_str::CompactString),
    Bytes(std::sync::Arc<[u8]>),
}

impl TryFrom<ParamValue> for IdScalar {
    type Error = MappingSpecError;

    fn try_from(value: ParamValue) -> Result<Self, Self::Error> {
        Ok(match value {
            ParamValue::Null => IdScalar::Null,
            ParamValue::Bool(b) => IdScalar::Bool(b),
            ParamValue::Int(i) => IdScalar::Int(i),
            ParamValue::Text(s) => IdScalar::Text(s),
            ParamValue::Bytes(b) => IdScalar::Bytes(b),
            ParamValue::Float(_) | ParamValue::Opaque(_) => {
                return Err(MappingSpecError::NonHashableIdValue)
            }
        })
    }
}

/// An identity key: one [`IdScalar`] per declared `id_field`, in the
/// order `MapperSpec::id_fields` declares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdKey(pub SmallVec<[IdScalar; 2]>);

impl IdKey {
    pub fn from_values(values: impl IntoIterator<Item = ParamValue>) -> Result<Self, MappingSpecError> {
        let scalars = values
            .into_iter()
            .map(IdScalar::try_from)
            .collect::<Result<SmallVec<[IdScalar; 2]>, _>>()?;
        Ok(IdKey(scalars))
    }
}
