//! Row decoding into a reusable scan buffer.
//!
//! The buffer holds one typed holder per discovered column. It is laid out
//! once from the column layout and refreshed in place for every row, so the
//! holders (and the string storage inside text holders) are allocated once per
//! querier rather than once per row.

use crate::error::{Error, Result};
use crate::query::classifier::{ColumnLayout, ColumnRole};
use crate::storage::{RowCursor, ValueRef};

/// Destination for one column of the current row.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanHolder {
    /// Nullable float, used for value columns
    Numeric(Option<f64>),
    /// Nullable text, used for label and unused columns. `valid` is false
    /// when the last scanned value was SQL null.
    Text { value: String, valid: bool },
}

impl ScanHolder {
    pub fn numeric() -> Self {
        ScanHolder::Numeric(None)
    }

    pub fn text() -> Self {
        ScanHolder::Text {
            value: String::new(),
            valid: false,
        }
    }

    /// Overwrite the holder with `value`, converting it to the holder's type.
    pub fn scan(&mut self, column: usize, value: ValueRef<'_>) -> Result<()> {
        match self {
            ScanHolder::Numeric(slot) => {
                *slot = match value {
                    ValueRef::Null => None,
                    ValueRef::Int(i) => Some(i as f64),
                    ValueRef::UInt(u) => Some(u as f64),
                    ValueRef::Float(f) => Some(f),
                    ValueRef::Text(s) => Some(s.trim().parse::<f64>().map_err(|e| {
                        Error::decode(column, format!("cannot convert {:?} to a float: {}", s, e))
                    })?),
                    ValueRef::Bool(b) => {
                        return Err(Error::decode(
                            column,
                            format!("cannot convert boolean {} to a float", b),
                        ))
                    }
                };
            }
            ScanHolder::Text { value: text, valid } => {
                text.clear();
                *valid = !matches!(value, ValueRef::Null);
                match value {
                    ValueRef::Null => {}
                    ValueRef::Text(s) => text.push_str(&s),
                    other => text.push_str(&other.to_string()),
                }
            }
        }
        Ok(())
    }

    /// `Some(value)` for numeric holders, `None` for text holders.
    pub fn numeric_value(&self) -> Option<Option<f64>> {
        match self {
            ScanHolder::Numeric(v) => Some(*v),
            ScanHolder::Text { .. } => None,
        }
    }

    /// `Some(value)` for text holders, `None` for numeric holders.
    pub fn text_value(&self) -> Option<Option<&str>> {
        match self {
            ScanHolder::Text { value, valid: true } => Some(Some(value.as_str())),
            ScanHolder::Text { valid: false, .. } => Some(None),
            ScanHolder::Numeric(_) => None,
        }
    }
}

/// Decodes rows of one query shape into a scan buffer laid out once.
#[derive(Debug)]
pub struct RowDecoder {
    layout: ColumnLayout,
    holders: Vec<ScanHolder>,
}

impl RowDecoder {
    pub fn new(layout: ColumnLayout) -> Self {
        let holders = layout
            .iter()
            .map(|column| match column.role {
                ColumnRole::Value(_) => ScanHolder::numeric(),
                ColumnRole::Label(_) | ColumnRole::Unused => ScanHolder::text(),
            })
            .collect();
        Self { layout, holders }
    }

    /// Scan the cursor's current row into the buffer.
    pub fn decode(&mut self, cursor: &mut dyn RowCursor) -> Result<()> {
        cursor.scan_into(&mut self.holders)
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn holders(&self) -> &[ScanHolder] {
        &self.holders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn numeric_holder_converts_and_resets() {
        let mut holder = ScanHolder::numeric();
        holder.scan(0, ValueRef::Int(7)).unwrap();
        assert_eq!(holder.numeric_value(), Some(Some(7.0)));
        holder.scan(0, ValueRef::Text(Cow::Borrowed(" 1.5 "))).unwrap();
        assert_eq!(holder.numeric_value(), Some(Some(1.5)));
        holder.scan(0, ValueRef::Null).unwrap();
        assert_eq!(holder.numeric_value(), Some(None));
    }

    #[test]
    fn numeric_holder_rejects_unparseable_text() {
        let mut holder = ScanHolder::numeric();
        let err = holder
            .scan(3, ValueRef::Text(Cow::Borrowed("n/a")))
            .unwrap_err();
        assert!(matches!(err, Error::Decode { column: Some(3), .. }));
        assert!(holder.scan(3, ValueRef::Bool(true)).is_err());
    }

    #[test]
    fn text_holder_does_not_leak_previous_row() {
        let mut holder = ScanHolder::text();
        holder
            .scan(0, ValueRef::Text(Cow::Borrowed("node1")))
            .unwrap();
        assert_eq!(holder.text_value(), Some(Some("node1")));
        holder.scan(0, ValueRef::Null).unwrap();
        assert_eq!(holder.text_value(), Some(None));
        holder.scan(0, ValueRef::Int(12)).unwrap();
        assert_eq!(holder.text_value(), Some(Some("12")));
        holder.scan(0, ValueRef::Bool(false)).unwrap();
        assert_eq!(holder.text_value(), Some(Some("false")));
    }
}
