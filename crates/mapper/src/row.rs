//! The minimal row contract the hydrator consumes — a driver-agnostic
//! view over one fetched row: a positional tuple whose length equals the
//! cursor's column count.

use sqlkit_core::ParamValue;

/// A single fetched row. Implemented by whatever the driver adapter in
/// `sqlkit-query` produces; the hydrator only ever reads by column index.
pub trait Row {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> ParamValue;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Row for Vec<ParamValue> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> ParamValue {
        self[index].clone()
    }
}

impl Row for [ParamValue] {
    fn len(&self) -> usize {
        <[ParamValue]>::len(self)
    }

    fn get(&self, index: usize) -> ParamValue {
        self[index].clone()
    }
}
