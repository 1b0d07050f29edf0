//! Result cursors.
//!
//! A cursor hands out rows as [`Record`]s, maps from column name to
//! [`Value`]. [`BufferedCursor`] holds a fully read result set.
//! [`StreamingCursor`] pulls rows from a live [`RowSource`] on demand and
//! only reads ahead when asked to seek or count.

pub mod buffered;
pub mod streaming;

use indexmap::IndexMap;

pub use buffered::BufferedCursor;
pub use streaming::{RowSource, StreamingCursor};

use crate::{error::Result, value::Value};

/// One row, keyed by column name in result order.
pub type Record = IndexMap<String, Value>;

pub(crate) fn make_record(columns: &[String], row: &[Value]) -> Record {
    columns.iter().cloned().zip(row.iter().cloned()).collect()
}

/// Row access over an executed statement.
///
/// After [`close`](ResultCursor::close), reads return `None` instead of
/// failing.
pub trait ResultCursor {
    fn columns(&self) -> &[String];

    /// The next row, or `None` at the end of the result set.
    fn next_record(&mut self) -> Result<Option<Record>>;

    /// Moves to the 0-based row `index` and returns it. The following
    /// [`next_record`](ResultCursor::next_record) returns row `index + 1`.
    fn seek(&mut self, index: usize) -> Result<Option<Record>>;

    /// Total number of rows. May read the whole result set.
    fn num_records(&mut self) -> Result<usize>;

    fn rewind(&mut self) -> Result<()>;

    /// Releases driver resources. Closing twice is a no-op.
    fn close(&mut self);

    fn first(&mut self) -> Result<Option<Record>> {
        self.rewind()?;
        self.next_record()
    }

    /// The first column of the next row.
    fn value(&mut self) -> Result<Option<Value>> {
        Ok(self
            .next_record()?
            .and_then(|record| record.into_iter().next().map(|(_, value)| value)))
    }

    /// Values of the first column for all remaining rows.
    fn column(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        while let Some(value) = self.value()? {
            values.push(value);
        }
        Ok(values)
    }

    /// Remaining rows as a map from the first column (as text) to the second.
    /// A single-column result maps each value to itself.
    fn map(&mut self) -> Result<IndexMap<String, Value>> {
        let mut map = IndexMap::new();
        while let Some(record) = self.next_record()? {
            let mut values = record.into_values();
            let Some(key) = values.next() else {
                continue;
            };
            let value = values.next().unwrap_or_else(|| key.clone());
            map.insert(key.to_string(), value);
        }
        Ok(map)
    }

    /// All remaining rows.
    fn records(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn iter(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records { cursor: self }
    }
}

impl<C: ResultCursor + ?Sized> ResultCursor for Box<C> {
    fn columns(&self) -> &[String] {
        (**self).columns()
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        (**self).next_record()
    }

    fn seek(&mut self, index: usize) -> Result<Option<Record>> {
        (**self).seek(index)
    }

    fn num_records(&mut self) -> Result<usize> {
        (**self).num_records()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Iterator over the remaining rows of a cursor.
pub struct Records<'a, C> {
    cursor: &'a mut C,
}

impl<C: ResultCursor> Iterator for Records<'_, C> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_record().transpose()
    }
}
