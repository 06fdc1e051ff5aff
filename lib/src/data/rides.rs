use std::{fs::File, io::Read, ops::Range, path::Path};

use ndarray::Array2;
use tracing::{debug, info};

use crate::{Error, Result};

/// Column holding the calendar date, kept as text next to the numeric columns.
pub const DATE_COLUMN: &str = "dteday";

/// A small column-major table of the hourly rides. Every column except the date is numeric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
  dates: Vec<String>,
  columns: Vec<String>,
  values: Vec<Vec<f64>>,
  rows: usize,
}

impl Frame {
  pub fn new(rows: usize) -> Self {
    Self {
      rows,
      ..Default::default()
    }
  }

  pub fn len(&self) -> usize {
    self.rows
  }

  pub fn is_empty(&self) -> bool {
    self.rows == 0
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  /// Empty when the source had no date column.
  pub fn dates(&self) -> &[String] {
    &self.dates
  }

  pub fn set_dates(&mut self, dates: Vec<String>) -> Result<()> {
    if dates.len() != self.rows {
      return Err(Error::mismatch("date rows", self.rows, dates.len()));
    }
    self.dates = dates;
    Ok(())
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.position(name).is_some()
  }

  pub fn column(&self, name: &str) -> Result<&[f64]> {
    let index = self.position_or_err(name)?;
    Ok(&self.values[index])
  }

  pub fn column_mut(&mut self, name: &str) -> Result<&mut [f64]> {
    let index = self.position_or_err(name)?;
    Ok(&mut self.values[index])
  }

  /// Appends a column, or replaces it if the name is taken.
  pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
    if values.len() != self.rows {
      return Err(Error::mismatch("column rows", self.rows, values.len()));
    }
    let name = name.into();
    match self.position(&name) {
      Some(index) => self.values[index] = values,
      None => {
        self.columns.push(name);
        self.values.push(values);
      }
    }
    Ok(())
  }

  /// Removes the named columns. Names not present are skipped, the date column included.
  pub fn drop_columns(&mut self, names: &[&str]) {
    let mut index = 0;
    while index < self.columns.len() {
      if names.contains(&self.columns[index].as_str()) {
        self.columns.remove(index);
        self.values.remove(index);
      } else {
        index += 1;
      }
    }
  }

  /// Gathers the named columns over a row range into a (rows, columns) matrix.
  pub fn to_array(&self, names: &[String], rows: Range<usize>) -> Result<Array2<f64>> {
    if rows.end > self.rows {
      return Err(Error::mismatch("frame rows", self.rows, rows.end));
    }
    let columns = names
      .iter()
      .map(|name| self.column(name))
      .collect::<Result<Vec<_>>>()?;
    let start = rows.start;
    Ok(Array2::from_shape_fn(
      (rows.len(), columns.len()),
      |(row, column)| columns[column][start + row],
    ))
  }

  fn position(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|column| column == name)
  }

  fn position_or_err(&self, name: &str) -> Result<usize> {
    self
      .position(name)
      .ok_or_else(|| Error::Dataset(format!("no column named {:?}", name)))
  }
}

/// Parses a headered rides CSV such as `hour.csv` of the UCI bike sharing dataset.
pub fn parse_rides<R: Read>(reader: R) -> Result<Frame> {
  let mut reader = csv::Reader::from_reader(reader);
  let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
  let date_index = headers.iter().position(|header| header == DATE_COLUMN);

  let mut dates = Vec::new();
  let mut values: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
  for (row, record) in reader.records().enumerate() {
    let record = record?;
    for (index, field) in record.iter().enumerate() {
      if Some(index) == date_index {
        dates.push(field.to_string());
        continue;
      }
      let value = field.trim().parse::<f64>().map_err(|_| {
        Error::Dataset(format!(
          "row {} column {:?}: {:?} is not a number",
          row + 1,
          headers[index],
          field
        ))
      })?;
      values[index].push(value);
    }
  }

  let rows = match date_index {
    Some(_) => dates.len(),
    None => values.first().map_or(0, Vec::len),
  };
  let mut frame = Frame::new(rows);
  for (index, (header, column)) in headers.into_iter().zip(values).enumerate() {
    if Some(index) != date_index {
      frame.push_column(header, column)?;
    }
  }
  if date_index.is_some() {
    frame.set_dates(dates)?;
  }
  debug!(rows = frame.len(), columns = frame.columns().len(), "parsed rides");
  Ok(frame)
}

pub fn read_rides(path: &Path) -> Result<Frame> {
  let file = File::open(path)?;
  let frame = parse_rides(file)?;
  info!("Loaded {} hourly records from {:?}", frame.len(), path);
  Ok(frame)
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use super::{parse_rides, read_rides};
  use crate::Error;

  const SAMPLE: &str = "\
instant,dteday,season,hr,temp,cnt
1,2011-01-01,1,0,0.24,16
2,2011-01-01,1,1,0.22,40
3,2011-01-02,2,2,0.22,32
";

  #[test]
  fn test_parse_rides() {
    let frame = parse_rides(SAMPLE.as_bytes()).unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.columns(), ["instant", "season", "hr", "temp", "cnt"]);
    assert_eq!(frame.dates(), ["2011-01-01", "2011-01-01", "2011-01-02"]);
    assert_eq!(frame.column("cnt").unwrap(), [16.0, 40.0, 32.0]);
    assert!(frame.column("casual").is_err());
  }

  #[test]
  fn test_parse_rejects_text_in_numeric_column() {
    let bad = "instant,cnt\n1,many\n";
    assert!(matches!(parse_rides(bad.as_bytes()), Err(Error::Dataset(_))));
  }

  #[test]
  fn test_drop_and_gather() {
    let mut frame = parse_rides(SAMPLE.as_bytes()).unwrap();
    frame.drop_columns(&["instant", "dteday", "not-there"]);
    assert_eq!(frame.columns(), ["season", "hr", "temp", "cnt"]);
    let matrix = frame
      .to_array(&["cnt".to_string(), "hr".to_string()], 1..3)
      .unwrap();
    assert_eq!(matrix, ndarray::array![[40.0, 1.0], [32.0, 2.0]]);
    assert!(frame.to_array(&["cnt".to_string()], 0..4).is_err());
  }

  #[test]
  fn test_push_column_checks_length() {
    let mut frame = parse_rides(SAMPLE.as_bytes()).unwrap();
    assert!(frame.push_column("extra", vec![1.0]).is_err());
    frame.push_column("temp", vec![0.0; 3]).unwrap();
    assert_eq!(frame.column("temp").unwrap(), [0.0, 0.0, 0.0]);
  }
  #[test]
  fn test_read_rides_from_file() {
    let path = std::env::temp_dir().join(format!("bikenet-rides-{}.csv", std::process::id()));
    std::fs::write(&path, SAMPLE).unwrap();
    let frame = read_rides(&path);
    std::fs::remove_file(&path).unwrap();

    let frame = frame.unwrap();
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.dates()[2], "2011-01-02");
    assert_eq!(frame.column("temp").unwrap(), [0.24, 0.22, 0.22]);
  }

  #[test]
  fn test_read_rides_missing_file() {
    let result = read_rides(Path::new("/nonexistent/bikenet/hour.csv"));
    assert!(matches!(result, Err(Error::Io(_))));
  }
}
