use std::collections::{BTreeMap, HashSet};

use crate::error::SchemaError;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free list of field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for f in &fields {
            if !seen.insert(f.as_str()) {
                return Err(SchemaError::DuplicateField(f.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Resolve names to column positions. `table` labels the error.
    ///
    /// Reports every missing name at once rather than the first one.
    pub fn resolve<S: AsRef<str>>(&self, table: &str, names: &[S]) -> Result<Vec<usize>, SchemaError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.index_of(name.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(SchemaError::MissingFields {
                table: table.to_string(),
                fields: missing,
            });
        }
        Ok(indices)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Borrowed view of one row: field names paired with values, in schema order.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        let values = self.values;
        self.schema.index_of(field).map(|i| &values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.schema
            .fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Owned, name-keyed copy of the row. Column order is dropped, which
    /// makes rows from differently ordered tables comparable.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Rows sharing one schema. Every row holds exactly `schema.len()` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(Schema::new(fields)?))
    }

    pub fn from_rows<I, S>(fields: I, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::with_fields(fields)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row to a table under construction.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SchemaError> {
        if row.len() != self.schema.len() {
            return Err(SchemaError::ArityMismatch {
                row: self.rows.len(),
                expected: self.schema.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            schema: &self.schema,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            schema: &self.schema,
            values,
        })
    }

    pub fn value(&self, row: usize, field: &str) -> Option<&Value> {
        let col = self.schema.index_of(field)?;
        self.rows.get(row).map(|r| &r[col])
    }

    pub fn column(&self, field: &str) -> Result<Vec<&Value>, SchemaError> {
        let col = self.schema.resolve("table", &[field])?[0];
        Ok(self.rows.iter().map(|r| &r[col]).collect())
    }

    /// Keep only `fields`, in the given order.
    pub fn select<S: AsRef<str>>(&self, fields: &[S]) -> Result<Table, SchemaError> {
        let indices = self.schema.resolve("table", fields)?;
        let schema = Schema::new(fields.iter().map(|f| f.as_ref().to_string()))?;
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        Ok(Table { schema, rows })
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<Table, SchemaError> {
        let col = self.schema.resolve("table", &[from])?[0];
        let mut fields = self.schema.fields.clone();
        fields[col] = to.to_string();
        Ok(Table {
            schema: Schema::new(fields)?,
            rows: self.rows.clone(),
        })
    }

    /// Return a copy with `field` set to `values`, appended if the field is new.
    pub fn with_column(&self, field: &str, values: Vec<Value>) -> Result<Table, SchemaError> {
        if values.len() != self.rows.len() {
            return Err(SchemaError::ColumnLength {
                field: field.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let mut out = self.clone();
        match self.schema.index_of(field) {
            Some(col) => {
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row[col] = v;
                }
            }
            None => {
                out.schema.fields.push(field.to_string());
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(out)
    }

    pub fn filter<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(Record<'_>) -> bool,
    {
        let rows = self
            .records()
            .filter(|r| keep(*r))
            .map(|r| r.values().to_vec())
            .collect();
        Table {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Drop repeated rows, keeping the first occurrence of each.
    pub fn distinct(&self) -> Table {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|r| seen.insert(r.as_slice()))
            .cloned()
            .collect();
        Table {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Rows of `self` followed by rows of `other`. Schemas must match exactly.
    pub fn concat(&self, other: &Table) -> Result<Table, SchemaError> {
        if self.schema != other.schema {
            return Err(SchemaError::Mismatch {
                left: self.schema.fields.clone(),
                right: other.schema.fields.clone(),
            });
        }
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Ok(Table {
            schema: self.schema.clone(),
            rows,
        })
    }

    /// Rows as name-keyed maps, sorted. Two tables holding the same multiset
    /// of records produce equal output regardless of row or column order.
    pub fn sorted_records(&self) -> Vec<BTreeMap<String, Value>> {
        let mut out: Vec<_> = self.records().map(|r| r.to_map()).collect();
        out.sort();
        out
    }
}
