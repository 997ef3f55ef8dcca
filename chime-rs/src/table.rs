use std::io;

use chrono::NaiveDate;

use crate::error::ChimeError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }
}

/// A date-keyed table of daily series, ascending by date. `day` counts from
/// the current date, so back-dated rows have negative days.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    days: Vec<i64>,
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        days: Vec<i64>,
        dates: Vec<NaiveDate>,
        columns: Vec<Column>,
    ) -> Result<Self, ChimeError> {
        let name = name.into();
        if days.len() != dates.len() {
            return Err(ChimeError::ParseTable(format!(
                "{name}: {} days but {} dates",
                days.len(),
                dates.len()
            )));
        }
        if let Some(column) = columns.iter().find(|c| c.values.len() != days.len()) {
            return Err(ChimeError::ParseTable(format!(
                "{name}: column {} has {} rows, expected {}",
                column.name,
                column.values.len(),
                days.len()
            )));
        }
        Ok(Table {
            name,
            days,
            dates,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> &[i64] {
        &self.days
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
    }

    /// The display variant: every value rounded down to an integer.
    pub fn floor(&self) -> Table {
        Table {
            name: self.name.clone(),
            days: self.days.clone(),
            dates: self.dates.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| Column {
                    name: column.name.clone(),
                    values: column.values.iter().map(|value| value.floor()).collect(),
                })
                .collect(),
        }
    }

    /// File name for a download of this table, e.g.
    /// `2020-03-28_projected_admits.csv`.
    pub fn file_name(&self, current_date: NaiveDate) -> String {
        format!("{current_date}_{}.csv", self.name)
    }

    pub fn headers(&self) -> Vec<&str> {
        let mut headers = vec!["day", "date"];
        headers.extend(self.columns.iter().map(|column| column.name.as_str()));
        headers
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), ChimeError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.headers())?;
        for (row, (day, date)) in self.days.iter().zip(&self.dates).enumerate() {
            let mut record = vec![day.to_string(), date.to_string()];
            record.extend(
                self.columns
                    .iter()
                    .map(|column| column.values[row].to_string()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, ChimeError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|err| ChimeError::ParseTable(err.to_string()))
    }

    /// Reads a table written by [`Table::write_csv`].
    pub fn from_csv<R: io::Read>(name: impl Into<String>, reader: R) -> Result<Table, ChimeError> {
        let name = name.into();
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.get(0) != Some("day") || headers.get(1) != Some("date") {
            return Err(ChimeError::ParseTable(format!(
                "{name}: expected day and date as the first columns"
            )));
        }
        let mut columns: Vec<Column> = headers
            .iter()
            .skip(2)
            .map(|header| Column::new(header, Vec::new()))
            .collect();
        let mut days = Vec::new();
        let mut dates = Vec::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |index: usize| {
                record.get(index).ok_or_else(|| {
                    ChimeError::ParseTable(format!("{name}: row {line} has no column {index}"))
                })
            };
            days.push(field(0)?.parse::<i64>().map_err(|err| {
                ChimeError::ParseTable(format!("{name}: row {line}: bad day: {err}"))
            })?);
            dates.push(field(1)?.parse::<NaiveDate>().map_err(|err| {
                ChimeError::ParseTable(format!("{name}: row {line}: bad date: {err}"))
            })?);
            for (index, column) in columns.iter_mut().enumerate() {
                let value = field(index + 2)?.parse::<f64>().map_err(|err| {
                    ChimeError::ParseTable(format!(
                        "{name}: row {line}: bad {}: {err}",
                        column.name
                    ))
                })?;
                column.values.push(value);
            }
        }
        Table::new(name, days, dates, columns)
    }
}
