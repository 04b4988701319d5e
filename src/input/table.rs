use crate::input::InputError;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    pub fn render(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v[row].to_string(),
            ColumnData::Text(v) => v[row].clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Column-major cell table: one row per event, one column per channel or metadata field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    pub n_rows: usize,
    pub columns: Vec<Column>,
}

impl SampleTable {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn push_numeric(&mut self, name: &str, values: Vec<f64>) -> Result<(), InputError> {
        self.push(name, ColumnData::Numeric(values))
    }

    pub fn push_text(&mut self, name: &str, values: Vec<String>) -> Result<(), InputError> {
        self.push(name, ColumnData::Text(values))
    }

    fn push(&mut self, name: &str, data: ColumnData) -> Result<(), InputError> {
        if data.len() != self.n_rows {
            return Err(InputError::InvalidInput(format!(
                "column {} has {} rows, table has {}",
                name,
                data.len(),
                self.n_rows
            )));
        }
        if self.column(name).is_some() {
            return Err(InputError::InvalidInput(format!(
                "duplicate column name: {}",
                name
            )));
        }
        self.columns.push(Column {
            name: name.to_string(),
            data,
        });
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Numeric(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn text(&self, name: &str) -> Option<&[String]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Text(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn numeric_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.data.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Removes the named columns and returns the names that were present.
    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        let mut dropped = Vec::new();
        self.columns.retain(|c| {
            if names.iter().any(|n| n == &c.name) {
                dropped.push(c.name.clone());
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Numeric columns only, excluding `exclude`.
    pub fn numeric_projection(&self, exclude: &[&str]) -> SampleTable {
        let columns = self
            .columns
            .iter()
            .filter(|c| c.data.is_numeric() && !exclude.contains(&c.name.as_str()))
            .cloned()
            .collect();
        SampleTable {
            n_rows: self.n_rows,
            columns,
        }
    }

    pub fn select_rows(&self, rows: &[usize]) -> SampleTable {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: match &c.data {
                    ColumnData::Numeric(v) => {
                        ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect())
                    }
                    ColumnData::Text(v) => {
                        ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect())
                    }
                },
            })
            .collect();
        SampleTable {
            n_rows: rows.len(),
            columns,
        }
    }

    /// Row-major copy of the numeric columns, in column order.
    pub fn numeric_rows(&self) -> Vec<Vec<f64>> {
        let numeric = self
            .columns
            .iter()
            .filter_map(|c| match &c.data {
                ColumnData::Numeric(v) => Some(v),
                ColumnData::Text(_) => None,
            })
            .collect::<Vec<_>>();
        let mut rows = Vec::with_capacity(self.n_rows);
        for row in 0..self.n_rows {
            rows.push(numeric.iter().map(|col| col[row]).collect());
        }
        rows
    }
}
