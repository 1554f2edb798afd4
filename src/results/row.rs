use std::collections::HashMap;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use crate::error::{Result, SqlHelperError};
use crate::types::RowValues;

/// Lower-cased label to column index, shared by every row of one result.
pub(crate) type LabelIndex = Arc<HashMap<String, usize>>;

/// Build the case-insensitive label index; the first of several equal labels wins.
pub(crate) fn label_index(labels: &[String]) -> LabelIndex {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        index.entry(label.to_lowercase()).or_insert(i);
    }
    Arc::new(index)
}

/// A row from a query result
///
/// An immutable snapshot holding the decoded values, the column labels shared across the
/// whole result, and the row's 0-based position within it.
///
/// ```rust
/// use std::sync::Arc;
/// use sql_helper::prelude::*;
///
/// let labels = Arc::new(vec!["ID".to_string(), "Name".to_string()]);
/// let row = Row::new(labels, vec![RowValues::Int(1), RowValues::Text("a".into())], 0);
/// assert_eq!(row.get("name").unwrap(), &RowValues::Text("a".into()));
/// assert_eq!(row.get_by_index(0).unwrap(), &RowValues::Int(1));
/// assert!(row.get("missing").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Row {
    labels: Arc<Vec<String>>,
    values: Vec<RowValues>,
    index: LabelIndex,
    rownum: usize,
}

impl Row {
    /// Create a row, building its own label index.
    #[must_use]
    pub fn new(labels: Arc<Vec<String>>, values: Vec<RowValues>, rownum: usize) -> Self {
        let index = label_index(&labels);
        Self::with_index(labels, index, values, rownum)
    }

    pub(crate) fn with_index(
        labels: Arc<Vec<String>>,
        index: LabelIndex,
        values: Vec<RowValues>,
        rownum: usize,
    ) -> Self {
        Self {
            labels,
            values,
            index,
            rownum,
        }
    }

    /// Get the index of a column by label, ignoring case
    #[must_use]
    pub fn get_column_index(&self, label: &str) -> Option<usize> {
        if let Some(&idx) = self.index.get(label) {
            return Some(idx);
        }
        self.index.get(&label.to_lowercase()).copied()
    }

    /// Get a value by column label, ignoring case.
    ///
    /// # Errors
    ///
    /// `UnknownColumn` when no column carries the label.
    pub fn get(&self, label: &str) -> Result<&RowValues> {
        self.get_column_index(label)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| SqlHelperError::UnknownColumn(label.to_string()))
    }

    /// Get a value by 0-based column index.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `index` is not below [`Row::len`].
    pub fn get_by_index(&self, index: usize) -> Result<&RowValues> {
        self.values.get(index).ok_or(SqlHelperError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    /// Consecutive values by column range; the end is clamped to the row length.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when the range starts past the end of the row.
    pub fn slice<R>(&self, range: R) -> Result<&[RowValues]>
    where
        R: RangeBounds<usize>,
    {
        let len = self.values.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start > len {
            return Err(SqlHelperError::IndexOutOfRange { index: start, len });
        }
        Ok(&self.values[start..end.max(start)])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 0-based position of this row within its result.
    #[must_use]
    pub fn rownum(&self) -> usize {
        self.rownum
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Rows compare by labels and values; the row number is ignored.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let labels = Arc::new(vec!["A".to_string(), "b".to_string(), "a".to_string()]);
        Row::new(labels, vec![1.into(), "two".into(), 3.into()], 4)
    }

    #[test]
    fn label_lookup_ignores_case() {
        let row = row();
        assert_eq!(row.get("B").unwrap(), &RowValues::from("two"));
        assert_eq!(row.get("b").unwrap(), &RowValues::from("two"));
        // duplicate under case-fold: first one wins
        assert_eq!(row.get("a").unwrap(), &RowValues::Int(1));
        assert!(matches!(
            row.get("c"),
            Err(SqlHelperError::UnknownColumn(name)) if name == "c"
        ));
    }

    #[test]
    fn index_lookup_is_bounded() {
        let row = row();
        assert_eq!(row.get_by_index(2).unwrap(), &RowValues::Int(3));
        assert!(matches!(
            row.get_by_index(3),
            Err(SqlHelperError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(row.len(), 3);
        assert_eq!(row.rownum(), 4);
    }

    #[test]
    fn slices() {
        let row = row();
        assert_eq!(
            row.slice(0..2).unwrap(),
            &[RowValues::Int(1), RowValues::from("two")]
        );
        assert_eq!(row.slice(1..).unwrap().len(), 2);
        assert_eq!(row.slice(..=0).unwrap(), &[RowValues::Int(1)]);
        assert_eq!(row.slice(1..10).unwrap().len(), 2);
        assert!(row.slice(3..).unwrap().is_empty());
        assert!(row.slice(4..).is_err());
    }

    #[test]
    fn iter_pairs_labels_with_values() {
        let row = row();
        let pairs: Vec<_> = row.iter().map(|(l, v)| (l.to_string(), v.clone())).collect();
        assert_eq!(pairs[1], ("b".to_string(), RowValues::from("two")));
        let mut other = row.clone();
        other.rownum = 0;
        assert_eq!(row, other);
    }
}
