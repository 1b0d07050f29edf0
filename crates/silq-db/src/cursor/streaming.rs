//! Lazily pulled result sets.

use tracing::trace;

use crate::{
    cursor::{make_record, Record, ResultCursor},
    error::{DbError, Result},
    value::Value,
};

/// A live result set owned by a driver.
///
/// Dropping the source releases its driver resources.
pub trait RowSource {
    fn columns(&self) -> &[String];

    /// Pulls the next row from the driver.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>>;
}

/// A cursor that pulls rows from a [`RowSource`] as they are read.
///
/// Sequential reads hand each row out without keeping it. The first
/// [`seek`], [`num_records`] or [`rewind`] away from the start switches the
/// cursor to buffering: from then on pulled rows are kept, so seeking
/// backwards never goes back to the driver. Rows read before the switch are
/// gone and moving back to one of them fails with [`DbError::RowDiscarded`].
///
/// The source is dropped exactly once: when it runs dry, on [`close`], or
/// with the cursor.
///
/// [`seek`]: ResultCursor::seek
/// [`num_records`]: ResultCursor::num_records
/// [`rewind`]: ResultCursor::rewind
/// [`close`]: ResultCursor::close
pub struct StreamingCursor<S: RowSource> {
    columns: Vec<String>,
    source: Option<S>,
    /// Kept rows, starting at absolute row `base`.
    rows: Vec<Vec<Value>>,
    base: usize,
    position: usize,
    buffering: bool,
}

impl<S: RowSource> StreamingCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            columns: source.columns().to_vec(),
            source: Some(source),
            rows: Vec::new(),
            base: 0,
            position: 0,
            buffering: false,
        }
    }

    /// Whether the driver result set is still held.
    pub fn is_streaming(&self) -> bool {
        self.source.is_some()
    }

    /// Whether pulled rows are being kept.
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Rows currently held in memory.
    pub fn buffered(&self) -> usize {
        self.rows.len()
    }

    /// Pulls the next row from the source, releasing it once it runs dry.
    fn pull(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let row = source.next_row()?;
        if row.is_none() {
            self.release();
        }
        Ok(row)
    }

    /// One past the last row pulled so far.
    fn end(&self) -> usize {
        self.base + self.rows.len()
    }

    fn start_buffering(&mut self) {
        if !self.buffering {
            trace!(discarded = self.base, "buffering streamed rows");
            self.buffering = true;
        }
    }

    /// Pulls and keeps rows until row `index` is held or the source runs dry.
    fn fill_to(&mut self, index: usize) -> Result<()> {
        while self.end() <= index {
            match self.pull()? {
                Some(row) => self.rows.push(row),
                None => break,
            }
        }
        Ok(())
    }

    fn kept(&self, index: usize) -> Result<Option<&Vec<Value>>> {
        if index < self.base {
            return Err(DbError::RowDiscarded {
                index,
                first: self.base,
            });
        }
        Ok(self.rows.get(index - self.base))
    }

    fn release(&mut self) {
        if self.source.take().is_some() {
            trace!(rows = self.end(), "released result set");
        }
    }
}

impl<S: RowSource> ResultCursor for StreamingCursor<S> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        if !self.buffering {
            let Some(row) = self.pull()? else {
                return Ok(None);
            };
            self.position += 1;
            self.base = self.position;
            return Ok(Some(make_record(&self.columns, &row)));
        }

        self.fill_to(self.position)?;
        let record = self
            .kept(self.position)?
            .map(|row| make_record(&self.columns, row));
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn seek(&mut self, index: usize) -> Result<Option<Record>> {
        self.start_buffering();
        self.fill_to(index)?;
        match self.kept(index)? {
            Some(row) => {
                let record = make_record(&self.columns, row);
                self.position = index + 1;
                Ok(Some(record))
            }
            None => {
                self.position = self.end();
                Ok(None)
            }
        }
    }

    /// Counts rows already read and discarded too.
    fn num_records(&mut self) -> Result<usize> {
        self.start_buffering();
        while let Some(row) = self.pull()? {
            self.rows.push(row);
        }
        Ok(self.end())
    }

    /// A no-op before the first read.
    fn rewind(&mut self) -> Result<()> {
        if self.position == 0 {
            return Ok(());
        }
        self.kept(0)?;
        self.start_buffering();
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.release();
        self.rows = Vec::new();
        self.base = 0;
        self.position = 0;
    }
}
