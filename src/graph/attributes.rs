use std::collections::BTreeMap;

use crate::error::{ChainError, Result};

/// A single typed attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl AttrValue {
    /// Coerce to f64 where the value is numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A full column of typed values, one per node (or edge).
#[derive(Clone, Debug, PartialEq)]
pub enum AttrColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
    Bool(Vec<bool>),
}

impl AttrColumn {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            AttrColumn::Int(v) => v.len(),
            AttrColumn::Float(v) => v.len(),
            AttrColumn::Str(v) => v.len(),
            AttrColumn::Bool(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn get(&self, i: usize) -> AttrValue {
        match self {
            AttrColumn::Int(v) => AttrValue::Int(v[i]),
            AttrColumn::Float(v) => AttrValue::Float(v[i]),
            AttrColumn::Str(v) => AttrValue::Str(v[i].clone()),
            AttrColumn::Bool(v) => AttrValue::Bool(v[i]),
        }
    }
}

/// Attribute columns indexed by name, all of equal length.
///
/// The table is frozen once its graph is constructed; lookups are by column
/// name plus row index. Iteration order over names is the sorted order of
/// the `BTreeMap`, which keeps every schema walk deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeTable {
    len: usize,
    columns: BTreeMap<String, AttrColumn>,
}

impl AttributeTable {
    /// Create an empty table for `len` rows.
    pub fn new(len: usize) -> Self {
        Self { len, columns: BTreeMap::new() }
    }

    /// Number of rows every column must have.
    #[inline] pub fn len(&self) -> usize { self.len }

    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Whether a column with the given name exists.
    #[inline] pub fn contains(&self, name: &str) -> bool { self.columns.contains_key(name) }

    /// Sorted iterator over column names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    /// Insert a column, replacing any column of the same name.
    /// Fails with `InvalidGraph` if the column length does not match.
    pub fn insert(&mut self, name: impl Into<String>, column: AttrColumn) -> Result<()> {
        let name = name.into();
        if column.len() != self.len {
            return Err(ChainError::InvalidGraph(format!(
                "attribute column '{}' has {} rows, expected {}",
                name, column.len(), self.len
            )));
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Typed lookup; `None` if the column does not exist.
    pub fn get(&self, name: &str, i: usize) -> Option<AttrValue> {
        debug_assert!(i < self.len, "row {} out of range", i);
        self.columns.get(name).map(|c| c.get(i))
    }

    /// Raw column access.
    #[inline]
    pub fn column(&self, name: &str) -> Option<&AttrColumn> { self.columns.get(name) }

    /// Integer lookup; fails with `MissingAttribute` unless the column
    /// exists and holds integers.
    pub fn int(&self, name: &str, i: usize) -> Result<i64> {
        match self.columns.get(name) {
            Some(AttrColumn::Int(v)) => Ok(v[i]),
            _ => Err(ChainError::MissingAttribute(name.to_string())),
        }
    }

    /// Numeric lookup, coercing integer columns to f64.
    pub fn float(&self, name: &str, i: usize) -> Result<f64> {
        match self.columns.get(name) {
            Some(AttrColumn::Float(v)) => Ok(v[i]),
            Some(AttrColumn::Int(v)) => Ok(v[i] as f64),
            _ => Err(ChainError::MissingAttribute(name.to_string())),
        }
    }

    /// String lookup.
    pub fn str(&self, name: &str, i: usize) -> Result<&str> {
        match self.columns.get(name) {
            Some(AttrColumn::Str(v)) => Ok(&v[i]),
            _ => Err(ChainError::MissingAttribute(name.to_string())),
        }
    }

    /// Boolean lookup.
    pub fn bool(&self, name: &str, i: usize) -> Result<bool> {
        match self.columns.get(name) {
            Some(AttrColumn::Bool(v)) => Ok(v[i]),
            _ => Err(ChainError::MissingAttribute(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AttributeTable {
        let mut t = AttributeTable::new(3);
        t.insert("pop", AttrColumn::Int(vec![10, 20, 30])).unwrap();
        t.insert("area", AttrColumn::Float(vec![1.5, 2.5, 3.5])).unwrap();
        t.insert("county", AttrColumn::Str(vec!["a".into(), "a".into(), "b".into()])).unwrap();
        t.insert("boundary_node", AttrColumn::Bool(vec![true, false, true])).unwrap();
        t
    }

    #[test]
    fn typed_lookups() {
        let t = table();
        assert_eq!(t.int("pop", 1).unwrap(), 20);
        assert_eq!(t.float("area", 2).unwrap(), 3.5);
        assert_eq!(t.str("county", 2).unwrap(), "b");
        assert!(t.bool("boundary_node", 0).unwrap());
    }

    #[test]
    fn float_coerces_int_column() {
        let t = table();
        assert_eq!(t.float("pop", 0).unwrap(), 10.0);
    }

    #[test]
    fn missing_column_fails() {
        let t = table();
        assert!(matches!(t.int("nope", 0), Err(ChainError::MissingAttribute(_))));
        assert!(matches!(t.int("area", 0), Err(ChainError::MissingAttribute(_))));
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut t = AttributeTable::new(3);
        let err = t.insert("pop", AttrColumn::Int(vec![1])).unwrap_err();
        assert!(matches!(err, ChainError::InvalidGraph(_)));
    }

    #[test]
    fn names_are_sorted() {
        let t = table();
        let names = t.names().collect::<Vec<_>>();
        assert_eq!(names, vec!["area", "boundary_node", "county", "pop"]);
    }
}
