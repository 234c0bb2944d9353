// etl_utils.rs
use crate::db_utils::DbConnect;
use crate::table_utils::TableBuilder;
use crate::text_utils::Export;
use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::error::Error;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new("[^a-zA-Z0-9]+").unwrap();
}

/// Target SQL engine for generated statements. Engines differ in type names,
/// placeholder style and date handling; everything else is shared text rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    Redshift,
    MySql,
    Teradata,
    Oracle,
}

/// A literal value destined for SQL text. Strings are single-quoted with embedded
/// quotes doubled; everything else renders bare.
#[derive(Debug, Clone)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Number(f64),
    Null,
}

impl SqlValue {
    pub fn render(&self) -> String {
        match self {
            SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Number(v) => v.to_string(),
            SqlValue::Null => "NULL".to_string(),
        }
    }
}

/// One column of an inferred table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub column: String,
    pub sql_type: String,
}

/// Specification for a source-to-target UPSERT (MERGE simulation).
#[derive(Debug, Clone)]
pub struct UpsertSpec<'a> {
    pub src_tbl: &'a str,
    pub tgt_tbl: &'a str,
    pub src_join_cols: Vec<&'a str>,
    pub src_insert_cols: Vec<&'a str>,
    /// Empty means no UPDATE statement is generated.
    pub src_update_cols: Vec<&'a str>,
    /// Extra inequality predicates restricting the UPDATE to changed rows.
    pub update_compare_cols: Vec<&'a str>,
}

/// Dynamic SQL text generation. All functions here are pure: identical inputs yield
/// byte-identical SQL.
pub struct SqlBuild;

impl SqlBuild {
    /// Converts column names to database standards: `#` becomes `num`, `%` becomes
    /// `pct`, other non-alphanumeric runs collapse to underscores, names are truncated
    /// to 200 characters, lowercased, and stripped of edge underscores.
    ///
    /// ```
    /// use fusetools::etl_utils::SqlBuild;
    ///
    /// let cols = SqlBuild::make_db_cols(&["Revenue %", "Item #", "Some Col!"]);
    /// assert_eq!(cols, vec!["revenue_pct", "item_num", "some_col"]);
    /// ```
    pub fn make_db_cols<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
        columns
            .iter()
            .map(|col| {
                let col = col.as_ref().replace('#', "num").replace('%', "pct");
                let col = NON_ALNUM.replace_all(&col, " ").to_string();
                let col = col.replace(' ', "_");
                let col: String = col.chars().take(200).collect();
                let col = col.to_lowercase();
                col.trim_matches('_').to_string()
            })
            .collect()
    }

    /// Appends a dynamically generated GROUP BY clause to a SQL statement. Dimension
    /// columns are the `as`-aliased selections appearing before `dim_fact_delim`.
    pub fn make_groupby(sql: &str, dim_fact_delim: &str) -> String {
        let flat = sql.replace('\n', "");
        let after_select = flat.splitn(2, "SELECT").nth(1).unwrap_or("");
        let dims_part = after_select.split(dim_fact_delim).next().unwrap_or("");

        let mut dim_segs = Vec::new();
        for d in dims_part.split(", ") {
            if d.trim().is_empty() {
                continue;
            }
            if let Some(alias) = d.split(" as ").nth(1) {
                dim_segs.push(alias.trim().to_string());
            }
        }

        let sql_all = format!("{} GROUP BY {}", sql, dim_segs.join(", "));
        sql_all.replace('\n', " ").replace('"', "")
    }

    /// Infers a SQL schema from tabular string data. Columns whose non-empty values
    /// all look like `YYYY-MM-DD...` become the dialect's date type; all-integer
    /// columns become INTEGER (falling back to VARCHAR when the max exceeds the
    /// 32-bit range); all-numeric columns become FLOAT; everything else is VARCHAR
    /// sized to the longest observed value.
    pub fn infer_schema(table: &TableBuilder, dialect: SqlDialect) -> Vec<ColumnSchema> {
        let headers = match table.get_headers() {
            Some(h) => h.clone(),
            None => return Vec::new(),
        };
        let empty: Vec<Vec<String>> = Vec::new();
        let data = table.get_data().unwrap_or(&empty);

        let db_cols = Self::make_db_cols(&headers);

        db_cols
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let cells: Vec<&str> = data
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|c| c.as_str())
                    .collect();

                let max_len = cells.iter().map(|c| c.len()).max().unwrap_or(1).max(1);
                let non_empty: Vec<&str> = cells
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect();

                let is_date = !non_empty.is_empty()
                    && non_empty.iter().all(|c| {
                        let prefix: String = c.chars().take(10).collect();
                        prefix.split('-').count() == 3
                    });

                let is_int = !non_empty.is_empty()
                    && non_empty
                        .iter()
                        .all(|c| c.parse::<f64>().map(|v| v.fract() == 0.0).unwrap_or(false));

                let is_float =
                    !non_empty.is_empty() && non_empty.iter().all(|c| c.parse::<f64>().is_ok());

                let int_overflow = is_int
                    && non_empty
                        .iter()
                        .filter_map(|c| c.parse::<f64>().ok())
                        .any(|v| v > 2147483647.0);

                let sql_type = if is_date {
                    match dialect {
                        SqlDialect::Teradata => "DATE".to_string(),
                        SqlDialect::MySql => "DATETIME".to_string(),
                        SqlDialect::Oracle => format!("VARCHAR({})", max_len),
                        _ => "TIMESTAMP".to_string(),
                    }
                } else if is_int && !int_overflow {
                    match dialect {
                        SqlDialect::Oracle => "NUMBER".to_string(),
                        _ => "INTEGER".to_string(),
                    }
                } else if is_float && !is_int {
                    match dialect {
                        SqlDialect::Oracle => format!("VARCHAR({})", max_len),
                        _ => "FLOAT".to_string(),
                    }
                } else {
                    format!("VARCHAR({})", max_len)
                };

                ColumnSchema {
                    column: col.clone(),
                    sql_type,
                }
            })
            .collect()
    }

    /// Creates a CREATE TABLE statement from tabular data with an inferred schema.
    pub fn make_tbl_sql(tbl_name: &str, table: &TableBuilder, dialect: SqlDialect) -> String {
        let schema = Self::infer_schema(table, dialect);
        let cols: Vec<String> = schema
            .iter()
            .map(|c| format!("{} {}", c.column, c.sql_type))
            .collect();
        format!("CREATE TABLE {} ( {} )", tbl_name, cols.join(", "))
    }

    /// Creates an INSERT statement with the dialect's positional placeholders.
    pub fn insert_placeholder_sql<S: AsRef<str>>(
        tbl_name: &str,
        cols: &[S],
        dialect: SqlDialect,
    ) -> String {
        let placeholders: Vec<String> = (1..=cols.len())
            .map(|i| match dialect {
                SqlDialect::MySql | SqlDialect::Teradata => "?".to_string(),
                SqlDialect::Postgres | SqlDialect::Redshift => format!("${}", i),
                SqlDialect::Oracle => format!(":{}", i),
            })
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            tbl_name,
            cols.iter()
                .map(|c| c.as_ref().to_string())
                .collect::<Vec<String>>()
                .join(", "),
            placeholders.join(", ")
        )
    }

    /// Creates an INSERT statement with literal values.
    pub fn insert_values_sql<S: AsRef<str>>(
        tbl_name: &str,
        col_list: &[S],
        val_list: &[SqlValue],
    ) -> String {
        format!(
            "INSERT INTO {} ( {} ) VALUES ( {} )",
            tbl_name,
            col_list
                .iter()
                .map(|c| c.as_ref().to_string())
                .collect::<Vec<String>>()
                .join(", "),
            val_list
                .iter()
                .map(|v| v.render())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }

    /// Creates a single-row UPSERT using Postgres `ON CONFLICT ... DO UPDATE`.
    pub fn upsert_values_sql<S: AsRef<str>>(
        tbl_name: &str,
        col_list: &[S],
        val_list: &[SqlValue],
        constraint_col: &str,
    ) -> String {
        let updates: Vec<String> = col_list
            .iter()
            .zip(val_list.iter())
            .map(|(c, v)| format!("{}={}", c.as_ref(), v.render()))
            .collect();

        format!(
            "{} ON CONFLICT ({}) DO UPDATE SET {}",
            Self::insert_values_sql(tbl_name, col_list, val_list),
            constraint_col,
            updates.join(", ")
        )
    }

    /// Creates the (UPDATE, INSERT) statement pair simulating an UPSERT for engines
    /// without native MERGE: matched rows are updated in place, unmatched rows are
    /// inserted via an anti-join.
    ///
    /// ```
    /// use fusetools::etl_utils::{SqlBuild, UpsertSpec};
    ///
    /// let spec = UpsertSpec {
    ///     src_tbl: "stage",
    ///     tgt_tbl: "target",
    ///     src_join_cols: vec!["id"],
    ///     src_insert_cols: vec!["id", "val"],
    ///     src_update_cols: vec!["val"],
    ///     update_compare_cols: vec![],
    /// };
    /// let (update_sql, insert_sql) = SqlBuild::upsert_tbl_sql(&spec);
    /// assert!(insert_sql.contains("WHERE t.id IS NULL"));
    /// assert!(update_sql.contains("SET val = s.val"));
    /// ```
    pub fn upsert_tbl_sql(spec: &UpsertSpec) -> (String, String) {
        let join_on = spec
            .src_join_cols
            .iter()
            .map(|c| format!("t.{} = s.{}", c, c))
            .collect::<Vec<String>>()
            .join(" AND ");

        let null_filter = spec
            .src_join_cols
            .iter()
            .map(|c| format!("t.{} IS NULL", c))
            .collect::<Vec<String>>()
            .join(" AND ");

        let insert_cols = spec
            .src_insert_cols
            .iter()
            .map(|c| format!("s.{}", c))
            .collect::<Vec<String>>()
            .join(", ");

        let sql_update = if spec.src_update_cols.is_empty() {
            String::new()
        } else {
            let set_clause = spec
                .src_update_cols
                .iter()
                .map(|c| format!("{} = s.{}", c, c))
                .collect::<Vec<String>>()
                .join(", ");

            let mut update_where = spec
                .src_join_cols
                .iter()
                .map(|c| format!("{}.{} = s.{}", spec.tgt_tbl, c, c))
                .collect::<Vec<String>>()
                .join(" AND ");

            if !spec.update_compare_cols.is_empty() {
                let compare = spec
                    .update_compare_cols
                    .iter()
                    .map(|c| format!("s.{} != {}.{}", c, spec.tgt_tbl, c))
                    .collect::<Vec<String>>()
                    .join(" AND ");
                update_where = format!("{} AND {}", update_where, compare);
            }

            format!(
                "/* Update records */ UPDATE {} SET {} FROM {} s WHERE {}",
                spec.tgt_tbl, set_clause, spec.src_tbl, update_where
            )
        };

        let sql_insert = format!(
            "/* Insert records */ INSERT INTO {} SELECT {} FROM {} s LEFT JOIN {} t ON {} WHERE {}",
            spec.tgt_tbl, insert_cols, spec.src_tbl, spec.tgt_tbl, join_on, null_filter
        );

        (sql_update, sql_insert)
    }
}

/// Window granularity for sequential loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFrequency {
    Monthly,
    Weekly,
}

/// One contiguous `[start, end)` load window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// How a date-filter placeholder in a load template is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilterKind {
    /// `AND date(f) >= start AND date(f) < end`
    Range,
    /// `AND date(f) < end`
    Before,
}

#[derive(Debug, Clone)]
pub struct DateFilter<'a> {
    pub placeholder: &'a str,
    pub field: &'a str,
    pub kind: DateFilterKind,
}

/// Placeholder tokens spliced per window into a load template.
#[derive(Debug, Clone)]
pub struct WindowPlaceholders<'a> {
    /// Replaced by `'start to end' as dt_range,` (the column later used to resume).
    pub range_tag: Option<&'a str>,
    pub date_filters: Vec<DateFilter<'a>>,
}

/// Configuration for a sequential date-range load into a target table.
#[derive(Debug, Clone)]
pub struct SequentialLoadConfig<'a> {
    /// Drop and recreate the target table, CREATE TABLE AS on the first window.
    pub override_table: bool,
    pub tgt_tbl: &'a str,
    pub dt_start: &'a str,
    pub dt_end: &'a str,
    pub template: &'a str,
    pub placeholders: WindowPlaceholders<'a>,
    /// When set, every rendered statement is dumped to `{log_dir}/{tgt_tbl}_{idx}.sql`.
    pub log_dir: Option<&'a str>,
}

fn next_month_start(d: NaiveDate) -> NaiveDate {
    if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1).unwrap()
    }
}

/// Builds the contiguous `[start, end)` windows between two dates. Monthly windows
/// run between month starts (the start date is floored to its month); weekly windows
/// step seven days from the start date. Only complete pairs are returned.
pub fn load_windows(
    dt_start: &str,
    dt_end: &str,
    freq: LoadFrequency,
) -> Result<Vec<LoadWindow>, Box<dyn Error>> {
    let start = NaiveDate::parse_from_str(dt_start, "%Y-%m-%d")?;
    let end = NaiveDate::parse_from_str(dt_end, "%Y-%m-%d")?;

    let mut marks: Vec<NaiveDate> = Vec::new();
    match freq {
        LoadFrequency::Monthly => {
            let mut cur = start.with_day(1).unwrap();
            while cur <= end {
                marks.push(cur);
                cur = next_month_start(cur);
            }
        }
        LoadFrequency::Weekly => {
            let mut cur = start;
            while cur <= end {
                marks.push(cur);
                cur += Duration::days(7);
            }
        }
    }

    Ok(marks
        .windows(2)
        .map(|pair| LoadWindow {
            start: pair[0],
            end: pair[1],
        })
        .collect())
}

/// Splices a window's date range into a load template: the range tag becomes a
/// `dt_range` column and each filter placeholder becomes its date predicate.
pub fn render_window_sql(
    template: &str,
    placeholders: &WindowPlaceholders,
    window: &LoadWindow,
) -> String {
    let start = window.start.format("%Y-%m-%d").to_string();
    let end = window.end.format("%Y-%m-%d").to_string();

    let mut sql = template.to_string();
    if let Some(tag) = placeholders.range_tag {
        sql = sql.replace(tag, &format!(" '{} to {}' as dt_range,", start, end));
    }

    for filter in &placeholders.date_filters {
        let clause = match filter.kind {
            DateFilterKind::Range => format!(
                " AND date({}) >= '{}' AND date({}) < '{}'",
                filter.field, start, filter.field, end
            ),
            DateFilterKind::Before => format!(" AND date({}) < '{}'", filter.field, end),
        };
        sql = sql.replace(filter.placeholder, &clause);
    }

    sql
}

async fn max_saved_end_date(
    username: &str,
    password: &str,
    server: &str,
    database: &str,
    tgt_tbl: &str,
) -> Option<NaiveDate> {
    let sql = format!(
        "select max(str_to_date(trim(substring_index(dt_range, 'to ', -1)), '%Y-%m-%d')) as day_idnt from {}",
        tgt_tbl
    );
    match DbConnect::execute_mysql_query(username, password, server, database, &sql).await {
        Ok((_, data)) => data
            .first()
            .and_then(|row| row.first())
            .and_then(|cell| NaiveDate::parse_from_str(cell, "%Y-%m-%d").ok()),
        Err(_) => None,
    }
}

async fn run_load_pass(
    username: &str,
    password: &str,
    server: &str,
    database: &str,
    config: &SequentialLoadConfig<'_>,
    freq: LoadFrequency,
    create_first: bool,
) -> Result<(), Box<dyn Error>> {
    let default_saved = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    let saved = max_saved_end_date(username, password, server, database, config.tgt_tbl)
        .await
        .unwrap_or(default_saved);

    let anchor = saved.with_day(1).unwrap();
    let windows: Vec<LoadWindow> = load_windows(config.dt_start, config.dt_end, freq)?
        .into_iter()
        .filter(|w| w.start >= anchor)
        .collect();

    if let Some(first) = windows.first() {
        println!("Starting load from: {} to {}", first.start, first.end);
    }

    for (idx, window) in windows.iter().enumerate() {
        let mut window = window.clone();

        // resume mid-window when the table already holds part of it
        if idx == 0 && saved != default_saved && saved != window.start && saved < window.end {
            let new_start = saved + Duration::days(1);
            println!(
                "latest saved data date in table is {} ...revising start date to: {} to {}",
                saved, new_start, window.end
            );
            window.start = new_start;
        }

        let sql = render_window_sql(config.template, &config.placeholders, &window);
        let sql_prefix = if idx == 0 && create_first {
            format!("CREATE TABLE {} AS ", config.tgt_tbl)
        } else {
            format!("INSERT INTO {} ", config.tgt_tbl)
        };
        let full_sql = format!("{}{}", sql_prefix, sql);

        println!("{} to {}", window.start, window.end);

        if let Some(log_dir) = config.log_dir {
            Export::dump_sql(&full_sql, &format!("{}/{}_{}", log_dir, config.tgt_tbl, idx))?;
        }

        DbConnect::execute_mysql_write(username, password, server, database, &full_sql).await?;
    }

    Ok(())
}

/// Runs a sequential date-range load against a MySQL database: monthly windows are
/// executed in order (CREATE TABLE AS on the first window when overriding, INSERT
/// INTO afterwards), resuming from the max `dt_range` end date already saved in the
/// target; a monthly failure cycles the remainder of the load down to weekly windows.
pub async fn sequential_load_mysql(
    username: &str,
    password: &str,
    server: &str,
    database: &str,
    config: &SequentialLoadConfig<'_>,
) -> Result<(), Box<dyn Error>> {
    if config.override_table {
        println!("table override true: dropping table: {}", config.tgt_tbl);
        if let Err(e) = DbConnect::execute_mysql_write(
            username,
            password,
            server,
            database,
            &format!("drop table {}", config.tgt_tbl),
        )
        .await
        {
            println!("table doesn't exist: {} ({})", config.tgt_tbl, e);
        }
    }

    match run_load_pass(
        username,
        password,
        server,
        database,
        config,
        LoadFrequency::Monthly,
        config.override_table,
    )
    .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            println!(
                "Insert failed on monthly level ({})...cycling down to weekly",
                e
            );
            run_load_pass(
                username,
                password,
                server,
                database,
                config,
                LoadFrequency::Weekly,
                false,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_db_cols_sanitizes_names() {
        let cols = SqlBuild::make_db_cols(&["Revenue %", "Item #", "Some Col!"]);
        assert_eq!(cols, vec!["revenue_pct", "item_num", "some_col"]);
    }

    #[test]
    fn make_db_cols_truncates_and_trims() {
        let long = "x".repeat(250);
        let cols = SqlBuild::make_db_cols(&[long.as_str(), "_edge_"]);
        assert_eq!(cols[0].len(), 200);
        assert_eq!(cols[1], "edge");
    }

    #[test]
    fn make_groupby_collects_dim_aliases() {
        let sql = "SELECT a as dim1, b as dim2, sum(x) as total FROM t";
        let out = SqlBuild::make_groupby(sql, "sum");
        assert!(out.ends_with("GROUP BY dim1, dim2"));
    }

    #[test]
    fn make_tbl_sql_infers_types() {
        let table = TableBuilder::from_raw_data(
            vec![
                "id".to_string(),
                "name".to_string(),
                "amt".to_string(),
                "dt".to_string(),
            ],
            vec![
                vec![
                    "1".to_string(),
                    "alpha".to_string(),
                    "1.5".to_string(),
                    "2024-01-01".to_string(),
                ],
                vec![
                    "2".to_string(),
                    "beta".to_string(),
                    "2.25".to_string(),
                    "2024-02-01".to_string(),
                ],
            ],
        );

        let sql = SqlBuild::make_tbl_sql("rpt.t1", &table, SqlDialect::Redshift);
        assert_eq!(
            sql,
            "CREATE TABLE rpt.t1 ( id INTEGER, name VARCHAR(5), amt FLOAT, dt TIMESTAMP )"
        );

        let td = SqlBuild::make_tbl_sql("rpt.t1", &table, SqlDialect::Teradata);
        assert!(td.contains("dt DATE"));

        let ora = SqlBuild::make_tbl_sql("rpt.t1", &table, SqlDialect::Oracle);
        assert!(ora.contains("id NUMBER"));
    }

    #[test]
    fn oversized_integers_fall_back_to_varchar() {
        let table = TableBuilder::from_raw_data(
            vec!["big".to_string()],
            vec![vec!["3000000000".to_string()], vec!["12".to_string()]],
        );
        let schema = SqlBuild::infer_schema(&table, SqlDialect::Redshift);
        assert_eq!(schema[0].sql_type, "VARCHAR(10)");
    }

    #[test]
    fn insert_placeholders_follow_dialect() {
        let cols = vec!["id", "val"];
        assert_eq!(
            SqlBuild::insert_placeholder_sql("t", &cols, SqlDialect::MySql),
            "INSERT INTO t (id, val) VALUES (?, ?)"
        );
        assert_eq!(
            SqlBuild::insert_placeholder_sql("t", &cols, SqlDialect::Redshift),
            "INSERT INTO t (id, val) VALUES ($1, $2)"
        );
        assert_eq!(
            SqlBuild::insert_placeholder_sql("t", &cols, SqlDialect::Oracle),
            "INSERT INTO t (id, val) VALUES (:1, :2)"
        );
    }

    #[test]
    fn insert_values_quotes_text_only() {
        let sql = SqlBuild::insert_values_sql(
            "t",
            &["name", "n", "note"],
            &[
                SqlValue::Text("o'hara".to_string()),
                SqlValue::Int(7),
                SqlValue::Null,
            ],
        );
        assert_eq!(sql, "INSERT INTO t ( name, n, note ) VALUES ( 'o''hara', 7, NULL )");
    }

    #[test]
    fn upsert_values_builds_conflict_clause() {
        let sql = SqlBuild::upsert_values_sql(
            "t",
            &["id", "val"],
            &[SqlValue::Int(1), SqlValue::Text("x".to_string())],
            "id",
        );
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET id=1, val='x'"));
    }

    #[test]
    fn upsert_tbl_pair_matches_expected_shape() {
        let spec = UpsertSpec {
            src_tbl: "stage",
            tgt_tbl: "target",
            src_join_cols: vec!["id"],
            src_insert_cols: vec!["id", "val"],
            src_update_cols: vec!["val"],
            update_compare_cols: vec![],
        };
        let (update_sql, insert_sql) = SqlBuild::upsert_tbl_sql(&spec);

        assert_eq!(
            insert_sql,
            "/* Insert records */ INSERT INTO target SELECT s.id, s.val FROM stage s \
             LEFT JOIN target t ON t.id = s.id WHERE t.id IS NULL"
        );
        assert_eq!(
            update_sql,
            "/* Update records */ UPDATE target SET val = s.val FROM stage s \
             WHERE target.id = s.id"
        );
    }

    #[test]
    fn upsert_tbl_compare_cols_restrict_updates() {
        let spec = UpsertSpec {
            src_tbl: "s1",
            tgt_tbl: "t1",
            src_join_cols: vec!["id", "day"],
            src_insert_cols: vec!["id", "day", "val"],
            src_update_cols: vec!["val"],
            update_compare_cols: vec!["val"],
        };
        let (update_sql, insert_sql) = SqlBuild::upsert_tbl_sql(&spec);

        assert!(update_sql.contains("t1.id = s.id AND t1.day = s.day AND s.val != t1.val"));
        assert!(insert_sql.contains("ON t.id = s.id AND t.day = s.day"));
        assert!(insert_sql.contains("WHERE t.id IS NULL AND t.day IS NULL"));
    }

    #[test]
    fn upsert_without_update_cols_skips_update() {
        let spec = UpsertSpec {
            src_tbl: "s1",
            tgt_tbl: "t1",
            src_join_cols: vec!["id"],
            src_insert_cols: vec!["id"],
            src_update_cols: vec![],
            update_compare_cols: vec![],
        };
        let (update_sql, insert_sql) = SqlBuild::upsert_tbl_sql(&spec);
        assert!(update_sql.is_empty());
        assert!(!insert_sql.is_empty());
    }

    #[test]
    fn generation_is_idempotent() {
        let spec = UpsertSpec {
            src_tbl: "stage",
            tgt_tbl: "target",
            src_join_cols: vec!["id"],
            src_insert_cols: vec!["id", "val"],
            src_update_cols: vec!["val"],
            update_compare_cols: vec!["val"],
        };
        assert_eq!(SqlBuild::upsert_tbl_sql(&spec), SqlBuild::upsert_tbl_sql(&spec));
    }

    #[test]
    fn monthly_windows_are_month_start_pairs() {
        let windows = load_windows("2024-01-15", "2024-04-10", LoadFrequency::Monthly).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(windows[0].end, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(windows[2].end, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    }

    #[test]
    fn weekly_windows_step_seven_days() {
        let windows = load_windows("2024-01-01", "2024-01-22", LoadFrequency::Weekly).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[1].start, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(windows[1].end, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn render_window_sql_splices_placeholders() {
        let template = "select {RANGE} count(*) as n from sales where 1=1 {DT1} {DT2}";
        let placeholders = WindowPlaceholders {
            range_tag: Some("{RANGE}"),
            date_filters: vec![
                DateFilter {
                    placeholder: "{DT1}",
                    field: "order_dt",
                    kind: DateFilterKind::Range,
                },
                DateFilter {
                    placeholder: "{DT2}",
                    field: "ship_dt",
                    kind: DateFilterKind::Before,
                },
            ],
        };
        let window = LoadWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };

        let sql = render_window_sql(template, &placeholders, &window);
        assert!(sql.contains("'2024-01-01 to 2024-02-01' as dt_range,"));
        assert!(sql.contains("AND date(order_dt) >= '2024-01-01' AND date(order_dt) < '2024-02-01'"));
        assert!(sql.contains("AND date(ship_dt) < '2024-02-01'"));
        assert_eq!(sql, render_window_sql(template, &placeholders, &window));
    }
}
