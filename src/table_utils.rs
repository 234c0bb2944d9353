// table_utils.rs
use crate::db_utils::DbConnect;
use crate::sheets_utils;
use anyhow::Result as AnyhowResult;
use calamine::{open_workbook, Reader, Xlsx};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fs::File;
use std::io::Error as IoError;
use std::io::ErrorKind;

/// A utility struct for converting JSON data to CSV format.
pub struct TableConverter;

/// Represents a tabular result set: named columns over rows of string cells. This is the
/// shape every vendor wrapper in this library reshapes its response into.
#[derive(Debug)]
pub struct TableBuilder {
    headers: Vec<String>,
    data: Vec<Vec<String>>,
    error: Option<Box<dyn Error>>,
}

impl TableConverter {
    /// Converts a JSON array of flat objects to a CSV file. Keys are taken from the
    /// first object; missing keys render as empty cells.
    ///
    /// ```
    /// use fusetools::table_utils::TableConverter;
    ///
    /// let json_data = r#"[
    ///     {"name": "Alice", "age": "30"},
    ///     {"name": "Bob", "age": "25"}
    /// ]"#;
    ///
    /// TableConverter::from_json(json_data, "/tmp/people.csv").unwrap();
    /// ```
    pub fn from_json(json_data: &str, file_path: &str) -> AnyhowResult<()> {
        let data: Value = serde_json::from_str(json_data)?;

        let file = File::create(file_path)?;
        let mut wtr = csv::Writer::from_writer(file);

        if let Value::Array(items) = data {
            let keys: Option<Vec<String>> = items.first().and_then(|item| match item {
                Value::Object(map) => Some(map.keys().cloned().collect()),
                _ => None,
            });

            if let Some(keys) = keys {
                wtr.write_record(&keys)?;

                let results: Vec<_> = items
                    .par_iter()
                    .filter_map(|item| {
                        if let Value::Object(map) = item {
                            let row: Vec<String> = keys
                                .iter()
                                .map(|key| {
                                    map.get(key).map_or_else(
                                        || "".to_string(),
                                        |v| match v {
                                            Value::String(s) => s.replace('"', ""),
                                            _ => v.to_string().replace('"', ""),
                                        },
                                    )
                                })
                                .collect();

                            Some(row)
                        } else {
                            None
                        }
                    })
                    .collect();

                for row in results {
                    wtr.write_record(&row)?;
                }
            }
        }

        wtr.flush()?;
        Ok(())
    }
}

impl TableBuilder {
    /// Creates a new, empty `TableBuilder`.
    pub fn new() -> Self {
        TableBuilder {
            headers: Vec::new(),
            data: Vec::new(),
            error: None,
        }
    }

    /// Creates a `TableBuilder` from headers and rows already in memory.
    pub fn from_raw_data(headers: Vec<String>, data: Vec<Vec<String>>) -> Self {
        TableBuilder {
            headers,
            data,
            error: None,
        }
    }

    /// Loads a CSV file. The first record is taken as the header row. A read failure is
    /// held in the builder's error slot rather than panicking.
    pub fn from_csv(file_path: &str) -> Self {
        let mut builder = TableBuilder::new();

        match File::open(file_path) {
            Ok(file) => {
                let mut rdr = csv::Reader::from_reader(file);

                if let Ok(hdrs) = rdr.headers() {
                    builder.headers = hdrs.iter().map(String::from).collect();
                }

                for result in rdr.records() {
                    match result {
                        Ok(record) => builder.data.push(record.iter().map(String::from).collect()),
                        Err(e) => {
                            builder.error = Some(Box::new(e));
                            break;
                        }
                    }
                }
            }
            Err(e) => builder.error = Some(Box::new(e)),
        }

        builder
    }

    /// Loads a worksheet from an XLSX file by sheet name.
    pub fn from_xlsx(file_path: &str, sheet_name: &str) -> Self {
        let mut builder = TableBuilder::new();

        match open_workbook::<Xlsx<_>, _>(file_path) {
            Ok(mut workbook) => match workbook.worksheet_range(sheet_name) {
                Ok(range) => {
                    for row in range.rows() {
                        let row_data: Vec<String> =
                            row.iter().map(|cell| cell.to_string()).collect();
                        if builder.headers.is_empty() {
                            builder.headers = row_data;
                        } else {
                            builder.data.push(row_data);
                        }
                    }
                }
                Err(e) => {
                    builder.error = Some(Box::new(e) as Box<dyn Error>);
                }
            },
            Err(e) => {
                builder.error = Some(Box::new(e) as Box<dyn Error>);
            }
        }

        builder
    }

    /// Parses a JSON array of flat objects into a table. Keys come from the first
    /// object (in serde_json's key order); missing keys render as empty cells.
    pub fn from_json_records(json_data: &str) -> Self {
        let mut builder = TableBuilder::new();

        let parsed: Result<Value, _> = serde_json::from_str(json_data);
        match parsed {
            Ok(Value::Array(items)) => {
                let keys: Vec<String> = items
                    .first()
                    .and_then(|item| match item {
                        Value::Object(map) => Some(map.keys().cloned().collect()),
                        _ => None,
                    })
                    .unwrap_or_default();

                if keys.is_empty() {
                    builder.error = Some(Box::new(IoError::new(
                        ErrorKind::InvalidData,
                        "Expected a JSON array of objects",
                    )));
                    return builder;
                }

                let rows: Vec<Vec<String>> = items
                    .par_iter()
                    .filter_map(|item| {
                        if let Value::Object(map) = item {
                            Some(
                                keys.iter()
                                    .map(|key| {
                                        map.get(key).map_or_else(
                                            || "".to_string(),
                                            |v| match v {
                                                Value::String(s) => s.clone(),
                                                Value::Null => "".to_string(),
                                                _ => v.to_string(),
                                            },
                                        )
                                    })
                                    .collect(),
                            )
                        } else {
                            None
                        }
                    })
                    .collect();

                builder.headers = keys;
                builder.data = rows;
            }
            Ok(_) => {
                builder.error = Some(Box::new(IoError::new(
                    ErrorKind::InvalidData,
                    "Expected a JSON array of objects",
                )));
            }
            Err(e) => builder.error = Some(Box::new(e)),
        }

        builder
    }

    /// Executes a query against a MySQL database and loads the result set.
    pub async fn from_mysql_query(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let (headers, data) =
            DbConnect::execute_mysql_query(username, password, server, database, sql_query).await?;
        Ok(TableBuilder::from_raw_data(headers, data))
    }

    /// Executes a query against a Microsoft SQL Server database and loads the result set.
    pub async fn from_mssql_query(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let (headers, data) =
            DbConnect::execute_mssql_query(username, password, server, database, sql_query).await?;
        Ok(TableBuilder::from_raw_data(headers, data))
    }

    /// Fetches a publicly viewable Google Sheet and loads it as a table.
    pub async fn from_google_sheet(url: &str) -> Result<Self, Box<dyn Error>> {
        let (headers, data) = sheets_utils::GoogleSheets::get_sheet_data(url).await?;
        Ok(TableBuilder::from_raw_data(headers, data))
    }

    /// Returns the headers, if any have been set.
    pub fn get_headers(&self) -> Option<&Vec<String>> {
        if self.headers.is_empty() {
            None
        } else {
            Some(&self.headers)
        }
    }

    /// Returns the data rows, if any have been loaded.
    pub fn get_data(&self) -> Option<&Vec<Vec<String>>> {
        if self.data.is_empty() {
            None
        } else {
            Some(&self.data)
        }
    }

    /// Returns any error captured while loading.
    pub fn get_error(&self) -> Option<&Box<dyn Error>> {
        self.error.as_ref()
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Position of a named column, if present.
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column_name)
    }

    /// All cell values of a named column, in row order.
    pub fn column_values(&self, column_name: &str) -> Vec<String> {
        match self.column_index(column_name) {
            Some(idx) => self
                .data
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Unique cell values of a named column, in first-seen order.
    pub fn get_unique(&self, column_name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut uniques = Vec::new();
        for value in self.column_values(column_name) {
            if seen.insert(value.clone()) {
                uniques.push(value);
            }
        }
        uniques
    }

    /// Replaces the header row.
    pub fn set_header(&mut self, header: Vec<&str>) -> &mut Self {
        self.headers = header.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn add_row(&mut self, row: Vec<&str>) -> &mut Self {
        self.data.push(row.iter().map(|cell| cell.to_string()).collect());
        self
    }

    pub fn add_rows(&mut self, rows: Vec<Vec<&str>>) -> &mut Self {
        for row in rows {
            self.add_row(row);
        }
        self
    }

    /// Keeps only the named columns, in the order given.
    pub fn retain_columns(&mut self, columns_to_retain: Vec<&str>) -> &mut Self {
        let indices: Vec<usize> = columns_to_retain
            .iter()
            .filter_map(|col| self.column_index(col))
            .collect();

        let new_headers: Vec<String> = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let new_data: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        self.headers = new_headers;
        self.data = new_data;
        self
    }

    /// Drops the named columns.
    pub fn drop_columns(&mut self, columns: Vec<&str>) -> &mut Self {
        let drop: HashSet<&str> = columns.into_iter().collect();
        let keep: Vec<String> = self
            .headers
            .iter()
            .filter(|h| !drop.contains(h.as_str()))
            .cloned()
            .collect();
        self.retain_columns(keep.iter().map(|s| s.as_str()).collect())
    }

    /// Renames columns via (old, new) pairs.
    pub fn rename_columns(&mut self, renames: Vec<(&str, &str)>) -> &mut Self {
        for (old_name, new_name) in renames {
            if let Some(idx) = self.column_index(old_name) {
                self.headers[idx] = new_name.to_string();
            }
        }
        self
    }

    /// Reorders columns: the named columns first, in the order given, then the rest in
    /// their original order.
    pub fn order_columns(&mut self, order: Vec<&str>) -> &mut Self {
        let mut ordered: Vec<String> = order
            .iter()
            .filter(|c| self.column_index(c).is_some())
            .map(|c| c.to_string())
            .collect();
        for h in &self.headers {
            if !ordered.contains(h) {
                ordered.push(h.clone());
            }
        }
        self.retain_columns(ordered.iter().map(|s| s.as_str()).collect())
    }

    /// Sorts rows by the given (column, "ASC"|"DESC") orderings, applied left to right.
    /// Cells that parse as numbers compare numerically, otherwise lexically.
    pub fn cascade_sort(&mut self, orders: Vec<(String, String)>) -> &mut Self {
        let resolved: Vec<(usize, bool)> = orders
            .iter()
            .filter_map(|(col, dir)| {
                self.column_index(col)
                    .map(|idx| (idx, dir.eq_ignore_ascii_case("ASC")))
            })
            .collect();

        self.data.sort_by(|a, b| {
            for &(idx, ascending) in &resolved {
                let left = a.get(idx).map(|s| s.as_str()).unwrap_or("");
                let right = b.get(idx).map(|s| s.as_str()).unwrap_or("");

                let ord = match (left.parse::<f64>(), right.parse::<f64>()) {
                    (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(std::cmp::Ordering::Equal),
                    _ => left.cmp(right),
                };

                let ord = if ascending { ord } else { ord.reverse() };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
        self
    }

    /// Removes duplicate rows, keeping first occurrences.
    pub fn remove_duplicates(&mut self) -> &mut Self {
        let mut seen = HashSet::new();
        self.data.retain(|row| seen.insert(row.join("\u{1f}")));
        self
    }

    /// Truncates the data to at most `limit` rows.
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.data.truncate(limit);
        self
    }

    /// Prints the row count.
    pub fn print_row_count(&mut self) -> &mut Self {
        println!("Total rows: {}", self.data.len());
        self
    }

    /// Prints all rows as a boxed table. Tables wider than 7 columns elide the middle
    /// columns: first four, last three.
    pub fn print_table_all_rows(&mut self) -> &mut Self {
        let total_rows = self.data.len();
        let max_cell_width: usize = 45;

        let mut max_lengths = self
            .headers
            .iter()
            .map(|h| h.len() + 1)
            .collect::<Vec<usize>>();
        for row in self.data.iter() {
            for (i, cell) in row.iter().enumerate() {
                if i < max_lengths.len() {
                    let current_max = std::cmp::max(max_lengths[i], cell.len());
                    max_lengths[i] = std::cmp::min(current_max, max_cell_width);
                }
            }
        }

        let format_cell = |s: &String, max_length: usize| -> String {
            format!("{:width$.width$}", s, width = max_length)
        };

        let headers_to_print = if self.headers.len() > 7 {
            let omitted_count = self.headers.len() - 7;
            let column_word = if omitted_count == 1 { "col" } else { "cols" };
            let ellipsis_text = format!("  <<+{} {}>> ", omitted_count, column_word);
            [
                &self.headers[..4],
                &vec![ellipsis_text],
                &self.headers[self.headers.len() - 3..],
            ]
            .concat()
        } else {
            self.headers.clone()
        };

        let adjusted_max_lengths = if self.headers.len() > 7 {
            let mut lengths = max_lengths[..4].to_vec();
            lengths.push(15);
            lengths.extend_from_slice(&max_lengths[max_lengths.len() - 3..]);
            lengths
        } else {
            max_lengths
        };

        let table_width = adjusted_max_lengths
            .iter()
            .map(|&len| len + 1)
            .sum::<usize>()
            + 1;

        println!(
            "\n|{}|",
            headers_to_print
                .iter()
                .zip(adjusted_max_lengths.iter())
                .map(|(header, &max_length)| format_cell(header, max_length))
                .collect::<Vec<String>>()
                .join("|")
        );
        println!("{}", "-".repeat(table_width));

        for row in self.data.iter() {
            let mut row_to_print = Vec::new();
            if self.headers.len() > 7 {
                for i in 0..4 {
                    row_to_print.push(row.get(i).cloned().unwrap_or_default());
                }
                row_to_print.push("...".to_string());
                for i in (self.headers.len() - 3)..self.headers.len() {
                    row_to_print.push(row.get(i).cloned().unwrap_or_default());
                }
            } else {
                row_to_print.extend_from_slice(row);
            }
            println!(
                "|{}|",
                row_to_print
                    .iter()
                    .zip(adjusted_max_lengths.iter())
                    .map(|(cell, &max_length)| format_cell(cell, max_length))
                    .collect::<Vec<String>>()
                    .join("|")
            );
        }

        println!("Total rows: {}", total_rows);

        self
    }

    /// Saves the table as a CSV file. Short rows are padded to the header length.
    pub fn save_as(&mut self, new_file_path: &str) -> Result<&mut Self, Box<dyn Error>> {
        let file = File::create(new_file_path)?;
        let mut wtr = csv::Writer::from_writer(file);

        if !self.headers.is_empty() {
            wtr.write_record(&self.headers)?;
        }

        let headers_len = self.headers.len();
        for record in &mut self.data {
            while record.len() < headers_len {
                record.push("".to_string());
            }
            wtr.write_record(record.iter())?;
        }

        wtr.flush()?;

        Ok(self)
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableBuilder {
        TableBuilder::from_raw_data(
            vec!["id".to_string(), "name".to_string(), "score".to_string()],
            vec![
                vec!["1".to_string(), "alpha".to_string(), "10".to_string()],
                vec!["2".to_string(), "beta".to_string(), "2".to_string()],
                vec!["3".to_string(), "gamma".to_string(), "30".to_string()],
            ],
        )
    }

    #[test]
    fn from_json_records_parses_objects() {
        let json_data = r#"[
            {"age": "30", "name": "Alice"},
            {"age": "25", "name": "Bob"}
        ]"#;
        let builder = TableBuilder::from_json_records(json_data);
        let headers = builder.get_headers().unwrap();
        assert!(headers.contains(&"name".to_string()));
        assert!(headers.contains(&"age".to_string()));
        assert_eq!(builder.get_data().unwrap().len(), 2);
    }

    #[test]
    fn retain_and_order_columns() {
        let mut builder = sample();
        builder.retain_columns(vec!["score", "id"]);
        assert_eq!(
            builder.get_headers().unwrap(),
            &vec!["score".to_string(), "id".to_string()]
        );
        assert_eq!(builder.get_data().unwrap()[0], vec!["10", "1"]);
    }

    #[test]
    fn drop_columns_removes_only_named() {
        let mut builder = sample();
        builder.drop_columns(vec!["name"]);
        assert_eq!(
            builder.get_headers().unwrap(),
            &vec!["id".to_string(), "score".to_string()]
        );
    }

    #[test]
    fn cascade_sort_is_numeric_aware() {
        let mut builder = sample();
        builder.cascade_sort(vec![("score".to_string(), "DESC".to_string())]);
        let data = builder.get_data().unwrap();
        assert_eq!(data[0][2], "30");
        assert_eq!(data[2][2], "2");
    }

    #[test]
    fn remove_duplicates_keeps_first() {
        let mut builder = TableBuilder::from_raw_data(
            vec!["a".to_string()],
            vec![
                vec!["x".to_string()],
                vec!["x".to_string()],
                vec!["y".to_string()],
            ],
        );
        builder.remove_duplicates();
        assert_eq!(builder.get_data().unwrap().len(), 2);
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let path_str = path.to_str().unwrap();

        let mut builder = sample();
        builder.save_as(path_str).unwrap();

        let reloaded = TableBuilder::from_csv(path_str);
        assert_eq!(reloaded.get_headers(), builder.get_headers());
        assert_eq!(reloaded.get_data(), builder.get_data());
    }

    #[test]
    fn unique_values_in_first_seen_order() {
        let builder = TableBuilder::from_raw_data(
            vec!["g".to_string()],
            vec![
                vec!["b".to_string()],
                vec!["a".to_string()],
                vec!["b".to_string()],
            ],
        );
        assert_eq!(builder.get_unique("g"), vec!["b", "a"]);
    }
}
