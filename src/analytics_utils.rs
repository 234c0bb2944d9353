// analytics_utils.rs
use crate::table_utils::TableBuilder;
use std::collections::HashMap;

/// Optional calendar-table join for comparison queries: attaches period start/end
/// dates to both sides of the self-join.
#[derive(Debug, Clone)]
pub struct DateJoin<'a> {
    pub tbl: &'a str,
    pub join_col: &'a str,
    pub time_start_col: &'a str,
    pub time_end_col: &'a str,
}

/// Analytical comparison SQL generation. Pure text rendering: identical inputs yield
/// byte-identical SQL.
pub struct AnalyticsSql;

impl AnalyticsSql {
    /// Builds a year-over-year comparison query. With an aggregation function the CTE
    /// carries two arms, a running 'Cumulative' total per year (window function) and
    /// a grouped 'Snapshot', self-joined so each period pairs with the same period of
    /// the prior year (`rs1.<year> = rs2.<year> + 1`). Without an aggregation function
    /// only the snapshot of the raw rows is compared.
    pub fn yoy_cum_comp_sql(
        tbl_name: &str,
        time_col: &str,
        year_col: &str,
        fact_cols: &[&str],
        agg_func: Option<&str>,
        dim_cols: &[&str],
        date_join: Option<&DateJoin>,
    ) -> String {
        let dim_select = dim_cols.join(", ");
        let dim_prefix = if dim_cols.is_empty() {
            String::new()
        } else {
            format!("{}, ", dim_select)
        };

        let cte = match agg_func {
            Some(agg) => {
                let partition = if dim_cols.is_empty() {
                    year_col.to_string()
                } else {
                    format!("{}, {}", year_col, dim_select)
                };

                let cum_facts = fact_cols
                    .iter()
                    .map(|f| {
                        format!(
                            "{}({}) over (partition by {} order by {} rows unbounded preceding) as {}",
                            agg, f, partition, time_col, f
                        )
                    })
                    .collect::<Vec<String>>()
                    .join(", ");

                let snap_facts = fact_cols
                    .iter()
                    .map(|f| format!("{}({}) as {}", agg, f, f))
                    .collect::<Vec<String>>()
                    .join(", ");

                let group_by = if dim_cols.is_empty() {
                    format!("{}, {}", time_col, year_col)
                } else {
                    format!("{}, {}, {}", time_col, year_col, dim_select)
                };

                format!(
                    "with rs as ( select 'Cumulative' as calc_type, {}{}, {}, {} from {} \
                     UNION select 'Snapshot' as calc_type, {}{}, {}, {} from {} group by {} )",
                    dim_prefix,
                    time_col,
                    year_col,
                    cum_facts,
                    tbl_name,
                    dim_prefix,
                    time_col,
                    year_col,
                    snap_facts,
                    tbl_name,
                    group_by
                )
            }
            None => {
                let raw_facts = fact_cols.join(", ");
                format!(
                    "with rs as ( select 'Snapshot' as calc_type, {}{}, {}, {} from {} )",
                    dim_prefix, time_col, year_col, raw_facts, tbl_name
                )
            }
        };

        let yeartime = |alias: &str| {
            format!(
                "cast({a}.{y}||lpad({a}.{t},2,0) as integer)",
                a = alias,
                y = year_col,
                t = time_col
            )
        };

        let mut select_parts: Vec<String> = vec![
            "current_date as run_date".to_string(),
            "rs1.calc_type".to_string(),
        ];
        for d in dim_cols {
            select_parts.push(format!("rs1.{}", d));
        }
        select_parts.push(format!("rs1.{} as year_col_curr", year_col));
        select_parts.push(format!("rs1.{} as time_col_curr", time_col));
        select_parts.push(format!("{} as yeartime_curr", yeartime("rs1")));
        if let Some(dj) = date_join {
            select_parts.push(format!(
                "date(dt_curr.{}) + 1 as start_date_curr",
                dj.time_start_col
            ));
            select_parts.push(format!("date(dt_curr.{}) as end_date_curr", dj.time_end_col));
        }
        for f in fact_cols {
            select_parts.push(format!("rs1.{} as {}_curr", f, f));
        }
        select_parts.push(format!("rs2.{} as year_col_prior", year_col));
        select_parts.push(format!("rs2.{} as time_col_prior", time_col));
        select_parts.push(format!("{} as yeartime_prior", yeartime("rs2")));
        if let Some(dj) = date_join {
            select_parts.push(format!(
                "date(dt_prior.{}) + 1 as start_date_prior",
                dj.time_start_col
            ));
            select_parts.push(format!(
                "date(dt_prior.{}) as end_date_prior",
                dj.time_end_col
            ));
        }
        for f in fact_cols {
            select_parts.push(format!("rs2.{} as {}_prior", f, f));
        }

        let mut joins = format!(
            "from rs rs1 left join rs rs2 on rs1.calc_type = rs2.calc_type \
             and rs1.{t} = rs2.{t} and rs1.{y} = rs2.{y} + 1",
            t = time_col,
            y = year_col
        );
        for d in dim_cols {
            joins.push_str(&format!(" and rs1.{d} = rs2.{d}", d = d));
        }
        if let Some(dj) = date_join {
            joins.push_str(&format!(
                " left join {} dt_curr on dt_curr.{} = {}",
                dj.tbl,
                dj.join_col,
                yeartime("rs1")
            ));
            joins.push_str(&format!(
                " left join {} dt_prior on dt_prior.{} = {}",
                dj.tbl,
                dj.join_col,
                yeartime("rs2")
            ));
        }

        format!(
            "{} select {} {} order by calc_type, yeartime_curr desc",
            cte,
            select_parts.join(", "),
            joins
        )
    }

    /// Builds a week-over-week comparison query: periods are ranked newest-first
    /// (optionally within dimensions) and each row pairs with the next-older rank
    /// (`dr1.time_col_rnk = dr2.time_col_rnk - 1`).
    pub fn wow_comp_sql(
        tbl_name: &str,
        time_col: &str,
        fact_cols: &[&str],
        dim_cols: &[&str],
        date_join: Option<&DateJoin>,
    ) -> String {
        let cte = if dim_cols.is_empty() {
            format!(
                "with dat_ranks as ( select x.*, rank() over (order by {} desc) as time_col_rnk from {} x )",
                time_col, tbl_name
            )
        } else {
            format!(
                "with dat_ranks as ( select x.*, rank() over ( partition by {} order by {} desc) as time_col_rnk from {} x )",
                dim_cols.join(", "),
                time_col,
                tbl_name
            )
        };

        let mut select_parts: Vec<String> = vec!["current_date as run_date".to_string()];
        for d in dim_cols {
            select_parts.push(format!("dr1.{}", d));
        }
        select_parts.push(format!("dr1.{} as time_col_curr", time_col));
        select_parts.push("dr1.time_col_rnk as time_col_rnk_curr".to_string());
        if let Some(dj) = date_join {
            select_parts.push(format!(
                "date(dt_curr.{}) + 1 as start_date_curr",
                dj.time_start_col
            ));
            select_parts.push(format!("date(dt_curr.{}) as end_date_curr", dj.time_end_col));
        }
        for f in fact_cols {
            select_parts.push(format!("dr1.{} as {}_curr", f, f));
        }
        select_parts.push(format!("dr2.{} as time_col_prior", time_col));
        select_parts.push("dr2.time_col_rnk as time_col_rnk_prior".to_string());
        if let Some(dj) = date_join {
            select_parts.push(format!(
                "date(dt_prior.{}) + 1 as start_date_prior",
                dj.time_start_col
            ));
            select_parts.push(format!(
                "date(dt_prior.{}) as end_date_prior",
                dj.time_end_col
            ));
        }
        for f in fact_cols {
            select_parts.push(format!("dr2.{} as {}_prior", f, f));
        }

        let mut joins =
            "from dat_ranks dr1 left join dat_ranks dr2 on dr1.time_col_rnk = dr2.time_col_rnk - 1"
                .to_string();
        for d in dim_cols {
            joins.push_str(&format!(" and dr1.{d} = dr2.{d}", d = d));
        }
        if let Some(dj) = date_join {
            joins.push_str(&format!(
                " left join {} dt_curr on dt_curr.{} = dr1.{}",
                dj.tbl, dj.join_col, time_col
            ));
            joins.push_str(&format!(
                " left join {} dt_prior on dt_prior.{} = dr2.{}",
                dj.tbl, dj.join_col, time_col
            ));
        }

        format!(
            "{} select {} {} order by dr1.time_col_rnk",
            cte,
            select_parts.join(", "),
            joins
        )
    }
}

pub(crate) fn parse_f64(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}

pub(crate) fn aggregate(values: &[f64], kpi: &str) -> Option<f64> {
    if values.is_empty() && kpi != "count" {
        return None;
    }
    match kpi {
        "sum" => Some(values.iter().sum()),
        "mean" => Some(values.iter().sum::<f64>() / values.len() as f64),
        "min" => values.iter().cloned().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        }),
        "max" => values.iter().cloned().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        }),
        "count" => Some(values.len() as f64),
        _ => None,
    }
}

pub(crate) fn format_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// Analytical computations over tabular data.
pub struct TableAnalytics;

impl TableAnalytics {
    /// Creates a snapshot comparison between periods: periods are ranked newest-first
    /// (within `dim` groups when given), each period pairs with the next-older one,
    /// and a `per_comp_<field><suffix>` percent-change column is appended per value
    /// field. `hist` keeps every adjacent pair instead of just the latest.
    pub fn period_comp(
        table: &TableBuilder,
        period_field: &str,
        val_fields: &[&str],
        dim: Option<&str>,
        val_field_suffix: Option<&str>,
        hist: bool,
    ) -> TableBuilder {
        let suffix = val_field_suffix.unwrap_or("");

        let period_idx = match table.column_index(period_field) {
            Some(i) => i,
            None => return TableBuilder::new(),
        };
        let dim_idx = dim.and_then(|d| table.column_index(d));
        let val_idxs: Vec<Option<usize>> =
            val_fields.iter().map(|v| table.column_index(v)).collect();

        let empty: Vec<Vec<String>> = Vec::new();
        let rows = match table.get_data() {
            Some(d) => d,
            None => &empty,
        };

        // rank periods newest-first within each dimension group
        let mut groups: HashMap<String, Vec<&Vec<String>>> = HashMap::new();
        for row in rows {
            let key = dim_idx
                .and_then(|i| row.get(i).cloned())
                .unwrap_or_default();
            groups.entry(key).or_default().push(row);
        }

        let mut headers: Vec<String> = Vec::new();
        if let Some(d) = dim {
            headers.push(d.to_string());
        }
        headers.push(format!("{}_1", period_field));
        headers.push(format!("{}_2", period_field));
        for v in val_fields {
            headers.push(format!("{}_1", v));
            headers.push(format!("{}_2", v));
            headers.push(format!("per_comp_{}{}", v, suffix));
        }

        let mut out_rows: Vec<Vec<String>> = Vec::new();
        let mut group_keys: Vec<&String> = groups.keys().collect();
        group_keys.sort();

        for key in group_keys {
            let mut group = groups[key].clone();
            group.sort_by(|a, b| {
                let left = a.get(period_idx).map(|s| s.as_str()).unwrap_or("");
                let right = b.get(period_idx).map(|s| s.as_str()).unwrap_or("");
                match (parse_f64(left), parse_f64(right)) {
                    (Some(l), Some(r)) => r.partial_cmp(&l).unwrap_or(std::cmp::Ordering::Equal),
                    _ => right.cmp(left),
                }
            });

            let pair_count = if hist {
                group.len().saturating_sub(1)
            } else {
                usize::from(group.len() >= 2)
            };

            for r in 0..pair_count {
                let curr = group[r];
                let prior = group[r + 1];

                let mut out_row: Vec<String> = Vec::new();
                if dim.is_some() {
                    out_row.push(key.clone());
                }
                out_row.push(curr.get(period_idx).cloned().unwrap_or_default());
                out_row.push(prior.get(period_idx).cloned().unwrap_or_default());

                for idx in &val_idxs {
                    let v1 = idx.and_then(|i| curr.get(i).cloned()).unwrap_or_default();
                    let v2 = idx.and_then(|i| prior.get(i).cloned()).unwrap_or_default();
                    let comp = match (parse_f64(&v1), parse_f64(&v2)) {
                        (Some(a), Some(b)) if b != 0.0 => ((a - b) / b).to_string(),
                        _ => String::new(),
                    };
                    out_row.push(v1);
                    out_row.push(v2);
                    out_row.push(comp);
                }
                out_rows.push(out_row);
            }
        }

        TableBuilder::from_raw_data(headers, out_rows)
    }

    /// Joins a grouped aggregation back onto every row as `<dim>_<metric>`; with
    /// `comp_col` a `<dim>_<metric>_pct` share-of-group column is appended too.
    pub fn append_window_agg(
        table: &TableBuilder,
        dim: &str,
        metric: &str,
        metric_agg: &str,
        comp_col: bool,
    ) -> TableBuilder {
        let dim_idx = table.column_index(dim);
        let metric_idx = table.column_index(metric);
        let (dim_idx, metric_idx) = match (dim_idx, metric_idx) {
            (Some(d), Some(m)) => (d, m),
            _ => return TableBuilder::new(),
        };

        let empty: Vec<Vec<String>> = Vec::new();
        let rows = table.get_data().unwrap_or(&empty);

        let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();
        for row in rows {
            let key = row.get(dim_idx).cloned().unwrap_or_default();
            if let Some(v) = row.get(metric_idx).and_then(|c| parse_f64(c)) {
                grouped.entry(key).or_default().push(v);
            } else {
                grouped.entry(key).or_default();
            }
        }

        let agg_col = format!("{}_{}", dim, metric);
        let mut headers = table.get_headers().cloned().unwrap_or_default();
        headers.push(agg_col.clone());
        if comp_col {
            headers.push(format!("{}_pct", agg_col));
        }

        let out_rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let key = row.get(dim_idx).cloned().unwrap_or_default();
                let agg_val = grouped
                    .get(&key)
                    .and_then(|vals| aggregate(vals, metric_agg));

                let mut out_row = row.clone();
                out_row.push(agg_val.map(format_num).unwrap_or_default());
                if comp_col {
                    let share = match (row.get(metric_idx).and_then(|c| parse_f64(c)), agg_val) {
                        (Some(v), Some(total)) if total != 0.0 => (v / total).to_string(),
                        _ => String::new(),
                    };
                    out_row.push(share);
                }
                out_row
            })
            .collect();

        TableBuilder::from_raw_data(headers, out_rows)
    }

    /// Creates a period-to-date aggregation: rows are filtered to the latest `year`
    /// (and latest `month` within it when `period` is "month"), then each value field
    /// is aggregated, optionally grouped by a dimension.
    pub fn ptd_measure(
        table: &TableBuilder,
        period: &str,
        val_fields: &[&str],
        kpi: &str,
        dim: Option<&str>,
    ) -> TableBuilder {
        let year_idx = match table.column_index("year") {
            Some(i) => i,
            None => return TableBuilder::new(),
        };

        let empty: Vec<Vec<String>> = Vec::new();
        let rows = table.get_data().unwrap_or(&empty);

        let max_year = rows
            .iter()
            .filter_map(|r| r.get(year_idx).and_then(|c| parse_f64(c)))
            .fold(f64::NEG_INFINITY, f64::max);

        let mut subset: Vec<&Vec<String>> = rows
            .iter()
            .filter(|r| {
                r.get(year_idx)
                    .and_then(|c| parse_f64(c))
                    .map(|v| v == max_year)
                    .unwrap_or(false)
            })
            .collect();

        if period == "month" {
            if let Some(month_idx) = table.column_index("month") {
                let max_month = subset
                    .iter()
                    .filter_map(|r| r.get(month_idx).and_then(|c| parse_f64(c)))
                    .fold(f64::NEG_INFINITY, f64::max);
                subset.retain(|r| {
                    r.get(month_idx)
                        .and_then(|c| parse_f64(c))
                        .map(|v| v == max_month)
                        .unwrap_or(false)
                });
            }
        }

        let dim_idx = dim.and_then(|d| table.column_index(d));
        let val_idxs: Vec<Option<usize>> =
            val_fields.iter().map(|v| table.column_index(v)).collect();

        let mut grouped: HashMap<String, Vec<&Vec<String>>> = HashMap::new();
        for row in subset {
            let key = dim_idx
                .and_then(|i| row.get(i).cloned())
                .unwrap_or_default();
            grouped.entry(key).or_default().push(row);
        }

        let mut headers: Vec<String> = Vec::new();
        if let Some(d) = dim {
            headers.push(d.to_string());
        }
        headers.extend(val_fields.iter().map(|v| v.to_string()));

        let mut group_keys: Vec<&String> = grouped.keys().collect();
        group_keys.sort();

        let out_rows: Vec<Vec<String>> = group_keys
            .iter()
            .map(|key| {
                let members = &grouped[*key];
                let mut out_row: Vec<String> = Vec::new();
                if dim.is_some() {
                    out_row.push((*key).clone());
                }
                for idx in &val_idxs {
                    let values: Vec<f64> = members
                        .iter()
                        .filter_map(|r| idx.and_then(|i| r.get(i)).and_then(|c| parse_f64(c)))
                        .collect();
                    out_row.push(aggregate(&values, kpi).map(format_num).unwrap_or_default());
                }
                out_row
            })
            .collect();

        TableBuilder::from_raw_data(headers, out_rows)
    }

    /// Appends a `year_start` column (`<year>-01-01`) derived from the `year` column.
    pub fn period_start_dt(table: &TableBuilder) -> TableBuilder {
        let year_idx = match table.column_index("year") {
            Some(i) => i,
            None => return TableBuilder::new(),
        };

        let mut headers = table.get_headers().cloned().unwrap_or_default();
        headers.push("year_start".to_string());

        let empty: Vec<Vec<String>> = Vec::new();
        let out_rows: Vec<Vec<String>> = table
            .get_data()
            .unwrap_or(&empty)
            .iter()
            .map(|row| {
                let mut out_row = row.clone();
                let year = row.get(year_idx).cloned().unwrap_or_default();
                out_row.push(format!("{}-01-01", year));
                out_row
            })
            .collect();

        TableBuilder::from_raw_data(headers, out_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yoy_sql_contains_window_and_year_offset_join() {
        let sql = AnalyticsSql::yoy_cum_comp_sql(
            "rpt.sales",
            "week",
            "year",
            &["revenue", "orders"],
            Some("sum"),
            &["region"],
            None,
        );

        assert!(sql.contains(
            "sum(revenue) over (partition by year, region order by week rows unbounded preceding) as revenue"
        ));
        assert!(sql.contains("and rs1.year = rs2.year + 1"));
        assert!(sql.contains("and rs1.region = rs2.region"));
        assert!(sql.contains("rs1.revenue as revenue_curr"));
        assert!(sql.contains("rs2.revenue as revenue_prior"));
        assert!(sql.contains("group by week, year, region"));
    }

    #[test]
    fn yoy_sql_without_dims_has_no_dangling_commas() {
        let sql = AnalyticsSql::yoy_cum_comp_sql(
            "t",
            "week",
            "year",
            &["revenue"],
            Some("sum"),
            &[],
            None,
        );
        assert!(!sql.contains(", ,"));
        assert!(!sql.contains(",,"));
        assert!(sql.contains("group by week, year "));
    }

    #[test]
    fn yoy_sql_is_idempotent() {
        let a = AnalyticsSql::yoy_cum_comp_sql(
            "t",
            "week",
            "year",
            &["revenue"],
            Some("sum"),
            &["region"],
            None,
        );
        let b = AnalyticsSql::yoy_cum_comp_sql(
            "t",
            "week",
            "year",
            &["revenue"],
            Some("sum"),
            &["region"],
            None,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn yoy_sql_date_join_attaches_calendar() {
        let dj = DateJoin {
            tbl: "cal.weeks",
            join_col: "yearweek",
            time_start_col: "wk_start",
            time_end_col: "wk_end",
        };
        let sql = AnalyticsSql::yoy_cum_comp_sql(
            "t",
            "week",
            "year",
            &["revenue"],
            Some("sum"),
            &[],
            Some(&dj),
        );
        assert!(sql.contains("left join cal.weeks dt_curr on dt_curr.yearweek ="));
        assert!(sql.contains("date(dt_prior.wk_end) as end_date_prior"));
    }

    #[test]
    fn wow_sql_ranks_and_joins_on_rank_offset() {
        let sql = AnalyticsSql::wow_comp_sql("rpt.sales", "week_id", &["revenue"], &["region"], None);

        assert!(sql.contains(
            "rank() over ( partition by region order by week_id desc) as time_col_rnk"
        ));
        assert!(sql.contains("on dr1.time_col_rnk = dr2.time_col_rnk - 1"));
        assert!(sql.contains("and dr1.region = dr2.region"));
        assert!(sql.contains("order by dr1.time_col_rnk"));
    }

    #[test]
    fn wow_sql_without_dims_uses_global_rank() {
        let sql = AnalyticsSql::wow_comp_sql("t", "week_id", &["revenue"], &[], None);
        assert!(sql.contains("rank() over (order by week_id desc) as time_col_rnk"));
        assert!(!sql.contains("partition by"));
    }

    fn weeks_table() -> TableBuilder {
        TableBuilder::from_raw_data(
            vec![
                "region".to_string(),
                "week".to_string(),
                "revenue".to_string(),
            ],
            vec![
                vec!["east".to_string(), "1".to_string(), "100".to_string()],
                vec!["east".to_string(), "2".to_string(), "150".to_string()],
                vec!["west".to_string(), "1".to_string(), "80".to_string()],
                vec!["west".to_string(), "2".to_string(), "60".to_string()],
            ],
        )
    }

    #[test]
    fn period_comp_pairs_latest_two_periods() {
        let out = TableAnalytics::period_comp(
            &weeks_table(),
            "week",
            &["revenue"],
            Some("region"),
            None,
            false,
        );

        let headers = out.get_headers().unwrap();
        assert_eq!(
            headers,
            &vec![
                "region".to_string(),
                "week_1".to_string(),
                "week_2".to_string(),
                "revenue_1".to_string(),
                "revenue_2".to_string(),
                "per_comp_revenue".to_string(),
            ]
        );

        let rows = out.get_data().unwrap();
        assert_eq!(rows.len(), 2);
        // east: (150 - 100) / 100 = 0.5
        assert_eq!(rows[0], vec!["east", "2", "1", "150", "100", "0.5"]);
        // west: (60 - 80) / 80 = -0.25
        assert_eq!(rows[1], vec!["west", "2", "1", "60", "80", "-0.25"]);
    }

    #[test]
    fn period_comp_hist_keeps_all_pairs() {
        let table = TableBuilder::from_raw_data(
            vec!["week".to_string(), "revenue".to_string()],
            vec![
                vec!["1".to_string(), "10".to_string()],
                vec!["2".to_string(), "20".to_string()],
                vec!["3".to_string(), "30".to_string()],
            ],
        );
        let out = TableAnalytics::period_comp(&table, "week", &["revenue"], None, None, true);
        assert_eq!(out.get_data().unwrap().len(), 2);
    }

    #[test]
    fn append_window_agg_joins_group_total() {
        let out = TableAnalytics::append_window_agg(&weeks_table(), "region", "revenue", "sum", true);

        let headers = out.get_headers().unwrap();
        assert!(headers.contains(&"region_revenue".to_string()));
        assert!(headers.contains(&"region_revenue_pct".to_string()));

        let rows = out.get_data().unwrap();
        // east total = 250, first east row share = 100/250
        assert_eq!(rows[0][3], "250");
        assert_eq!(rows[0][4], "0.4");
    }

    #[test]
    fn ptd_measure_filters_to_latest_year() {
        let table = TableBuilder::from_raw_data(
            vec![
                "year".to_string(),
                "region".to_string(),
                "revenue".to_string(),
            ],
            vec![
                vec!["2023".to_string(), "east".to_string(), "5".to_string()],
                vec!["2024".to_string(), "east".to_string(), "10".to_string()],
                vec!["2024".to_string(), "east".to_string(), "15".to_string()],
                vec!["2024".to_string(), "west".to_string(), "7".to_string()],
            ],
        );
        let out = TableAnalytics::ptd_measure(&table, "year", &["revenue"], "sum", Some("region"));

        let rows = out.get_data().unwrap();
        assert_eq!(rows, &vec![
            vec!["east".to_string(), "25".to_string()],
            vec!["west".to_string(), "7".to_string()],
        ]);
    }

    #[test]
    fn period_start_dt_appends_first_of_year() {
        let table = TableBuilder::from_raw_data(
            vec!["year".to_string()],
            vec![vec!["2024".to_string()]],
        );
        let out = TableAnalytics::period_start_dt(&table);
        assert_eq!(out.get_data().unwrap()[0][1], "2024-01-01");
    }
}
