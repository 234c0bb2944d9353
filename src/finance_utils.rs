// finance_utils.rs
use crate::api_utils::ApiCallBuilder;
use crate::table_utils::TableBuilder;
use chrono::{DateTime, Datelike, NaiveDate};
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::error::Error;

/// Miscellaneous functions for financial tasks.
pub struct Misc;

impl Misc {
    /// Rounds a decimal to the nearest base provided (defaulting callers to a nickel),
    /// then to cents.
    pub fn round_nickel(x: f64, base: f64) -> f64 {
        ((base * (x / base).round()) * 100.0).round() / 100.0
    }
}

/// Functions for retrieving stock quotes.
pub struct Quotes;

impl Quotes {
    /// Pulls adjusted time-series quote data from the Alphavantage API.
    ///
    /// `freq` is "D", "W" or "M"; `size` is "compact" or "full". Rows come back
    /// newest first with the ticker appended to every row.
    pub async fn alpha_vantage(
        ticker: &str,
        api_key: &str,
        freq: &str,
        size: &str,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let (function, series_key) = match freq {
            "D" => ("TIME_SERIES_DAILY_ADJUSTED", "Time Series (Daily)"),
            "W" => ("TIME_SERIES_WEEKLY_ADJUSTED", "Weekly Adjusted Time Series"),
            "M" => ("TIME_SERIES_MONTHLY_ADJUSTED", "Monthly Adjusted Time Series"),
            _ => return Err("Unsupported frequency; use D, W or M".into()),
        };

        let body = ApiCallBuilder::call(
            "GET",
            "https://www.alphavantage.co/query",
            None,
            Some(json!({
                "function": function,
                "symbol": ticker,
                "outputsize": size,
                "apikey": api_key,
            })),
        )
        .execute()
        .await?;

        Self::parse_alpha_vantage(&body, series_key, ticker)
    }

    /// Parses an Alphavantage time-series response body into a table. Series field
    /// names ("1. open", "5. adjusted close", ...) keep their vendor order but lose
    /// the numeric prefixes.
    pub fn parse_alpha_vantage(
        body: &str,
        series_key: &str,
        ticker: &str,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let json: Value = serde_json::from_str(body)?;

        let series = json
            .get(series_key)
            .and_then(|v| v.as_object())
            .ok_or_else(|| format!("Series '{}' missing in response", series_key))?;

        let mut dates: Vec<&String> = series.keys().collect();
        dates.sort();
        dates.reverse();

        // field names like "1. open" sort by their numeric prefix
        let mut field_keys: Vec<String> = dates
            .first()
            .and_then(|d| series.get(*d))
            .and_then(|v| v.as_object())
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        field_keys.sort();

        let mut headers = vec!["date".to_string()];
        headers.extend(field_keys.iter().map(|k| {
            k.splitn(2, ". ")
                .nth(1)
                .unwrap_or(k)
                .replace(' ', "_")
        }));
        headers.push("ticker".to_string());

        let rows: Vec<Vec<String>> = dates
            .iter()
            .map(|date| {
                let mut row = vec![date.to_string()];
                let bar = series.get(*date);
                for key in &field_keys {
                    let cell = bar
                        .and_then(|b| b.get(key))
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    row.push(cell);
                }
                row.push(ticker.to_string());
                row
            })
            .collect();

        Ok(TableBuilder::from_raw_data(headers, rows))
    }

    /// Pulls daily quote data from the Yahoo Finance chart API for a date range.
    /// `time_frame` "d" returns daily bars; "w" rolls them up to weekly bars.
    pub async fn yahoo_finance(
        ticker: &str,
        from_date: &str,
        to_date: &str,
        time_frame: &str,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let period1 = NaiveDate::parse_from_str(from_date, "%Y-%m-%d")?
            .and_hms_opt(0, 0, 0)
            .ok_or("Bad from_date")?
            .and_utc()
            .timestamp();
        let period2 = NaiveDate::parse_from_str(to_date, "%Y-%m-%d")?
            .and_hms_opt(0, 0, 0)
            .ok_or("Bad to_date")?
            .and_utc()
            .timestamp();

        let url = format!("https://query1.finance.yahoo.com/v8/finance/chart/{}", ticker);
        let body = ApiCallBuilder::call(
            "GET",
            &url,
            None,
            Some(json!({
                "period1": period1.to_string(),
                "period2": period2.to_string(),
                "interval": "1d",
            })),
        )
        .execute()
        .await?;

        let daily = Self::parse_yahoo_chart(&body, ticker)?;
        if time_frame == "w" {
            Self::to_weekly(&daily)
        } else {
            Ok(daily)
        }
    }

    /// Parses a Yahoo Finance v8 chart response body into a daily-bar table with
    /// columns datetime2, o, h, l, c, ac, v, ticker.
    pub fn parse_yahoo_chart(body: &str, ticker: &str) -> Result<TableBuilder, Box<dyn Error>> {
        let json: Value = serde_json::from_str(body)?;

        let result = &json["chart"]["result"][0];
        let timestamps = result["timestamp"]
            .as_array()
            .ok_or("Timestamps missing in chart response")?;
        let quote = &result["indicators"]["quote"][0];
        let adjclose = &result["indicators"]["adjclose"][0]["adjclose"];

        let series = |name: &str| -> Vec<Value> {
            quote[name].as_array().cloned().unwrap_or_default()
        };
        let opens = series("open");
        let highs = series("high");
        let lows = series("low");
        let closes = series("close");
        let volumes = series("volume");
        let adjcloses = adjclose.as_array().cloned().unwrap_or_default();

        let cell = |arr: &[Value], i: usize| -> String {
            arr.get(i)
                .and_then(|v| v.as_f64())
                .map(|v| v.to_string())
                .unwrap_or_default()
        };

        let headers = vec![
            "datetime2".to_string(),
            "o".to_string(),
            "h".to_string(),
            "l".to_string(),
            "c".to_string(),
            "ac".to_string(),
            "v".to_string(),
            "ticker".to_string(),
        ];

        let rows: Vec<Vec<String>> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let ts = ts.as_i64()?;
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(vec![
                    date.format("%Y-%m-%d").to_string(),
                    cell(&opens, i),
                    cell(&highs, i),
                    cell(&lows, i),
                    cell(&closes, i),
                    cell(&adjcloses, i),
                    cell(&volumes, i),
                    ticker.to_string(),
                ])
            })
            .collect();

        Ok(TableBuilder::from_raw_data(headers, rows))
    }

    /// Rolls a daily-bar table up to weekly bars per ISO year/week: first open, last
    /// close, max high, min low, summed volume.
    pub fn to_weekly(daily: &TableBuilder) -> Result<TableBuilder, Box<dyn Error>> {
        let date_idx = daily.column_index("datetime2").ok_or("No datetime2 column")?;
        let idx = |name: &str| daily.column_index(name).ok_or("Missing quote column");
        let (o_idx, h_idx, l_idx, c_idx, v_idx, t_idx) = (
            idx("o")?,
            idx("h")?,
            idx("l")?,
            idx("c")?,
            idx("v")?,
            idx("ticker")?,
        );

        let empty: Vec<Vec<String>> = Vec::new();
        let data = daily.get_data().unwrap_or(&empty);

        struct WeekBar {
            ticker: String,
            date_start: NaiveDate,
            date_end: NaiveDate,
            open: String,
            close: String,
            high: f64,
            low: f64,
            volume: f64,
        }

        let mut weeks: HashMap<String, WeekBar> = HashMap::new();
        for row in data {
            let date = match NaiveDate::parse_from_str(&row[date_idx], "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => continue,
            };
            let week_number = format!("{}{:02}", date.iso_week().year(), date.iso_week().week());

            let parse = |i: usize| row.get(i).and_then(|c| c.parse::<f64>().ok());
            let high = parse(h_idx).unwrap_or(f64::NEG_INFINITY);
            let low = parse(l_idx).unwrap_or(f64::INFINITY);
            let volume = parse(v_idx).unwrap_or(0.0);

            let entry = weeks.entry(week_number).or_insert_with(|| WeekBar {
                ticker: row.get(t_idx).cloned().unwrap_or_default(),
                date_start: date,
                date_end: date,
                open: row.get(o_idx).cloned().unwrap_or_default(),
                close: row.get(c_idx).cloned().unwrap_or_default(),
                high: f64::NEG_INFINITY,
                low: f64::INFINITY,
                volume: 0.0,
            });

            if date < entry.date_start {
                entry.date_start = date;
                entry.open = row.get(o_idx).cloned().unwrap_or_default();
            }
            if date >= entry.date_end {
                entry.date_end = date;
                entry.close = row.get(c_idx).cloned().unwrap_or_default();
            }
            entry.high = entry.high.max(high);
            entry.low = entry.low.min(low);
            entry.volume += volume;
        }

        let headers = vec![
            "week_number".to_string(),
            "ticker".to_string(),
            "date_start".to_string(),
            "date_end".to_string(),
            "o".to_string(),
            "c".to_string(),
            "h".to_string(),
            "l".to_string(),
            "v".to_string(),
        ];

        let mut week_keys: Vec<String> = weeks.keys().cloned().collect();
        week_keys.sort();

        let rows: Vec<Vec<String>> = week_keys
            .iter()
            .map(|k| {
                let bar = &weeks[k];
                vec![
                    k.clone(),
                    bar.ticker.clone(),
                    bar.date_start.format("%Y-%m-%d").to_string(),
                    bar.date_end.format("%Y-%m-%d").to_string(),
                    bar.open.clone(),
                    bar.close.clone(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.volume.to_string(),
                ]
            })
            .collect();

        Ok(TableBuilder::from_raw_data(headers, rows))
    }

    /// Fetches daily quotes for many tickers concurrently. Results come back in the
    /// order the tickers were given, each with its own success or failure.
    pub async fn yahoo_finance_many(
        tickers: &[&str],
        from_date: &str,
        to_date: &str,
    ) -> Vec<Result<TableBuilder, Box<dyn Error>>> {
        let futures = tickers
            .iter()
            .map(|ticker| Self::yahoo_finance(ticker, from_date, to_date, "d"));
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_nickel_rounds_to_base() {
        assert_eq!(Misc::round_nickel(1.02, 0.05), 1.0);
        assert_eq!(Misc::round_nickel(1.03, 0.05), 1.05);
        assert_eq!(Misc::round_nickel(2.49, 0.25), 2.5);
    }

    #[test]
    fn parse_yahoo_chart_extracts_bars() {
        // two bars: 2024-01-02 and 2024-01-03 (UTC midnights)
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600, 1704240000],
                    "indicators": {
                        "quote": [{
                            "open": [10.0, 11.0],
                            "high": [12.0, 13.0],
                            "low": [9.0, 10.5],
                            "close": [11.5, 12.5],
                            "volume": [1000, 2000]
                        }],
                        "adjclose": [{"adjclose": [11.4, 12.4]}]
                    }
                }]
            }
        }"#;

        let table = Quotes::parse_yahoo_chart(body, "ACME").unwrap();
        let rows = table.get_data().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2024-01-02");
        assert_eq!(rows[0][1], "10");
        assert_eq!(rows[1][4], "12.5");
        assert_eq!(rows[0][7], "ACME");
    }

    #[test]
    fn parse_alpha_vantage_orders_newest_first() {
        let body = r#"{
            "Meta Data": {"2. Symbol": "ACME"},
            "Time Series (Daily)": {
                "2024-01-02": {"1. open": "10.0", "2. high": "12.0", "4. close": "11.5"},
                "2024-01-03": {"1. open": "11.0", "2. high": "13.0", "4. close": "12.5"}
            }
        }"#;

        let table = Quotes::parse_alpha_vantage(body, "Time Series (Daily)", "ACME").unwrap();
        assert_eq!(
            table.get_headers().unwrap(),
            &vec![
                "date".to_string(),
                "open".to_string(),
                "high".to_string(),
                "close".to_string(),
                "ticker".to_string(),
            ]
        );
        let rows = table.get_data().unwrap();
        assert_eq!(rows[0][0], "2024-01-03");
        assert_eq!(rows[1][1], "10.0");
    }

    #[test]
    fn to_weekly_rolls_up_daily_bars() {
        // Tue 2024-01-02 .. Mon 2024-01-08 spans ISO weeks 1 and 2
        let daily = TableBuilder::from_raw_data(
            vec![
                "datetime2".to_string(),
                "o".to_string(),
                "h".to_string(),
                "l".to_string(),
                "c".to_string(),
                "ac".to_string(),
                "v".to_string(),
                "ticker".to_string(),
            ],
            vec![
                vec!["2024-01-02", "10", "12", "9", "11", "11", "100", "ACME"],
                vec!["2024-01-03", "11", "14", "10", "13", "13", "200", "ACME"],
                vec!["2024-01-08", "13", "15", "12", "14", "14", "300", "ACME"],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(String::from).collect())
            .collect(),
        );

        let weekly = Quotes::to_weekly(&daily).unwrap();
        let rows = weekly.get_data().unwrap();
        assert_eq!(rows.len(), 2);

        // week 1: open from Jan 2, close from Jan 3, high 14, volume 300
        assert_eq!(rows[0][0], "202401");
        assert_eq!(rows[0][4], "10");
        assert_eq!(rows[0][5], "13");
        assert_eq!(rows[0][6], "14");
        assert_eq!(rows[0][8], "300");

        // week 2 holds only Jan 8
        assert_eq!(rows[1][0], "202402");
        assert_eq!(rows[1][2], "2024-01-08");
    }
}
