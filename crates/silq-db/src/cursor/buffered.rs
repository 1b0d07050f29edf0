use crate::{
    cursor::{make_record, Record, ResultCursor},
    error::Result,
    value::Value,
};

/// A cursor over rows that were read in full when the statement ran.
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: usize,
    closed: bool,
}

impl BufferedCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: 0,
            closed: false,
        }
    }

    fn record_at(&self, index: usize) -> Option<Record> {
        self.rows.get(index).map(|row| make_record(&self.columns, row))
    }
}

impl ResultCursor for BufferedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        let record = self.record_at(self.position);
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn seek(&mut self, index: usize) -> Result<Option<Record>> {
        let record = self.record_at(index);
        self.position = if record.is_some() {
            index + 1
        } else {
            self.rows.len()
        };
        Ok(record)
    }

    fn num_records(&mut self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.rows = Vec::new();
            self.position = 0;
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: i64) -> BufferedCursor {
        BufferedCursor::new(
            vec!["N".into()],
            (0..n).map(|i| vec![Value::Integer(i)]).collect(),
        )
    }

    #[test]
    fn test_seek_then_continue() {
        let mut cursor = numbers(5);
        assert_eq!(cursor.seek(3).unwrap().unwrap()["N"], Value::Integer(3));
        assert_eq!(cursor.next_record().unwrap().unwrap()["N"], Value::Integer(4));
        assert!(cursor.next_record().unwrap().is_none());
        assert!(cursor.seek(9).unwrap().is_none());

        cursor.rewind().unwrap();
        assert_eq!(cursor.next_record().unwrap().unwrap()["N"], Value::Integer(0));
        assert_eq!(cursor.num_records().unwrap(), 5);
    }

    #[test]
    fn test_reads_after_close_return_nothing() {
        let mut cursor = numbers(2);
        cursor.close();
        cursor.close();
        assert!(cursor.next_record().unwrap().is_none());
        assert_eq!(cursor.num_records().unwrap(), 0);
        assert_eq!(cursor.columns(), ["N".to_string()]);
    }
}
