// research_utils.rs
use crate::api_utils::{ApiCallBuilder, RetryPolicy};
use crate::table_utils::TableBuilder;
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};
use std::error::Error;

const BLS_TIMESERIES_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";

/// Functions for dealing with Economic data sources.
pub struct Economics;

impl Economics {
    /// Reshapes one BLS timeseries response into rows of
    /// (series_id, year, period, period_name, value, month_start, month_end).
    pub fn bls_series_rows(body: &str, series_id: &str) -> Result<Vec<Vec<String>>, Box<dyn Error>> {
        let json: Value = serde_json::from_str(body)?;

        let data = json["Results"]["series"][0]["data"]
            .as_array()
            .ok_or("No series data in BLS response")?;

        let rows = data
            .iter()
            .map(|point| {
                let year = point["year"].as_str().unwrap_or("").to_string();
                let period = point["period"].as_str().unwrap_or("").to_string();

                // period "M05" -> month 05; month_end is the last day of that month
                let (month_start, month_end) = if period.len() >= 2 {
                    let month_start = format!("{}-{}-01", year, &period[period.len() - 2..]);
                    let month_end = NaiveDate::parse_from_str(&month_start, "%Y-%m-%d")
                        .ok()
                        .and_then(last_day_of_month)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    (month_start, month_end)
                } else {
                    (String::new(), String::new())
                };

                vec![
                    series_id.to_string(),
                    year,
                    period,
                    point["periodName"].as_str().unwrap_or("").to_string(),
                    point["value"].as_str().unwrap_or("").to_string(),
                    month_start,
                    month_end,
                ]
            })
            .collect();

        Ok(rows)
    }

    /// Whether a BLS response signals the daily request threshold was hit.
    fn threshold_exceeded(body: &str) -> bool {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json["message"]
                    .as_array()
                    .map(|msgs| msgs.iter().any(|m| {
                        m.as_str().unwrap_or("").contains("daily threshold")
                    }))
            })
            .unwrap_or(false)
    }

    /// Retrieves BLS timeseries figures for a set of series ids, rotating through the
    /// supplied API keys when one hits its daily threshold.
    pub async fn bls_series(
        series_ids: &[&str],
        start_year: &str,
        end_year: &str,
        api_keys: &[&str],
    ) -> Result<TableBuilder, Box<dyn Error>> {
        Self::bls_series_at(BLS_TIMESERIES_URL, series_ids, start_year, end_year, api_keys).await
    }

    async fn bls_series_at(
        url: &str,
        series_ids: &[&str],
        start_year: &str,
        end_year: &str,
        api_keys: &[&str],
    ) -> Result<TableBuilder, Box<dyn Error>> {
        if api_keys.is_empty() {
            return Err("At least one BLS API key is required".into());
        }

        let mut key_num = 0;
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (idx, series_id) in series_ids.iter().enumerate() {
            println!("progress...{}/{}", idx, series_ids.len());

            let mut body = Self::bls_post(url, series_id, start_year, end_year, api_keys[key_num])
                .await?;

            if Self::threshold_exceeded(&body) && key_num + 1 < api_keys.len() {
                println!("Switching API key");
                key_num += 1;
                body = Self::bls_post(url, series_id, start_year, end_year, api_keys[key_num])
                    .await?;
            }

            match Self::bls_series_rows(&body, series_id) {
                Ok(series_rows) => rows.extend(series_rows),
                Err(e) => println!("No response on {} ({})", series_id, e),
            }
        }

        Ok(TableBuilder::from_raw_data(
            vec![
                "series_id".to_string(),
                "year".to_string(),
                "period".to_string(),
                "period_name".to_string(),
                "value".to_string(),
                "month_start".to_string(),
                "month_end".to_string(),
            ],
            rows,
        ))
    }

    async fn bls_post(
        url: &str,
        series_id: &str,
        start_year: &str,
        end_year: &str,
        api_key: &str,
    ) -> Result<String, Box<dyn Error>> {
        ApiCallBuilder::call(
            "POST",
            url,
            Some(json!({"Content-type": "application/json"})),
            Some(json!({
                "seriesid": [series_id],
                "startyear": start_year,
                "endyear": end_year,
                "registrationkey": api_key,
            })),
        )
        .retries(RetryPolicy::fixed(2, 3500))
        .execute()
        .await
    }

    /// Reshapes a BEA Regional response into a table of
    /// (data_values, time_periods, geo_names, cl_units, unit_mults).
    pub fn bea_gdp_table(body: &str) -> Result<TableBuilder, Box<dyn Error>> {
        let json: Value = serde_json::from_str(body)?;

        let data = json["BEAAPI"]["Results"]["Data"]
            .as_array()
            .ok_or("No data in BEA response")?;

        let field = |point: &Value, key: &str| point[key].as_str().unwrap_or("").to_string();

        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|point| {
                vec![
                    field(point, "DataValue"),
                    field(point, "TimePeriod"),
                    field(point, "GeoName"),
                    field(point, "CL_UNIT"),
                    field(point, "UNIT_MULT"),
                ]
            })
            .collect();

        Ok(TableBuilder::from_raw_data(
            vec![
                "data_values".to_string(),
                "time_periods".to_string(),
                "geo_names".to_string(),
                "cl_units".to_string(),
                "unit_mults".to_string(),
            ],
            rows,
        ))
    }

    /// Queries state-level GDP from the BEA Regional dataset.
    pub async fn bea_gdp(api_key: &str, tbl_name: &str) -> Result<TableBuilder, Box<dyn Error>> {
        let body = ApiCallBuilder::call(
            "GET",
            "https://apps.bea.gov/api/data/",
            None,
            Some(json!({
                "UserID": api_key,
                "method": "GetData",
                "datasetname": "Regional",
                "TableName": tbl_name,
                "LineCode": "3",
                "GeoFIPS": "STATE",
                "ResultFormat": "JSON",
            })),
        )
        .execute()
        .await?;

        Self::bea_gdp_table(&body)
    }
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    next_month.pred_opt()
}

/// Functions for dealing with Geographical tasks.
pub struct Geography;

impl Geography {
    /// Calculates the great-circle distance in miles between two coordinate pairs.
    pub fn calculate_distance(lat_from: f64, lon_from: f64, lat_to: f64, lon_to: f64) -> f64 {
        const EARTH_RADIUS_MILES: f64 = 3958.7613;

        let lat1 = lat_from.to_radians();
        let lat2 = lat_to.to_radians();
        let dlat = (lat_to - lat_from).to_radians();
        let dlon = (lon_to - lon_from).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_MILES * c
    }

    /// Parses a Walk Score response into (bike, transit, walk) scores.
    pub fn parse_scores(body: &str) -> Result<(f64, f64, f64), Box<dyn Error>> {
        let json: Value = serde_json::from_str(body)?;
        let bike = json["bike"]["score"].as_f64().ok_or("No bike score")?;
        let transit = json["transit"]["score"].as_f64().ok_or("No transit score")?;
        let walk = json["walkscore"].as_f64().ok_or("No walk score")?;
        Ok((bike, transit, walk))
    }

    /// Retrieves walk/bike/transit scores for an address from the Walk Score API.
    pub async fn walk_bike_transit_score(
        addr: &str,
        lat: &str,
        lon: &str,
        api_key: &str,
    ) -> Result<(f64, f64, f64), Box<dyn Error>> {
        let body = ApiCallBuilder::call(
            "GET",
            "https://api.walkscore.com/score",
            None,
            Some(json!({
                "format": "json",
                "address": addr,
                "lat": lat,
                "lon": lon,
                "transit": "1",
                "bike": "1",
                "wsapikey": api_key,
            })),
        )
        .execute()
        .await?;

        Self::parse_scores(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const BLS_BODY: &str = r#"{
        "status": "REQUEST_SUCCEEDED",
        "Results": {"series": [{"seriesID": "CUUR0000SA0", "data": [
            {"year": "2024", "period": "M02", "periodName": "February", "value": "310.3"},
            {"year": "2024", "period": "M01", "periodName": "January", "value": "309.7"}
        ]}]}
    }"#;

    #[test]
    fn bls_rows_carry_month_bounds() {
        let rows = Economics::bls_series_rows(BLS_BODY, "CUUR0000SA0").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "CUUR0000SA0");
        assert_eq!(rows[0][5], "2024-02-01");
        assert_eq!(rows[0][6], "2024-02-29");
        assert_eq!(rows[1][6], "2024-01-31");
    }

    #[tokio::test]
    async fn bls_series_rotates_keys_on_threshold() {
        let server = MockServer::start();
        let threshold = server.mock(|when, then| {
            when.method(POST).path("/bls").body_contains("key-one");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(r#"{"status": "REQUEST_NOT_PROCESSED", "message": ["...daily threshold..."]}"#);
        });
        let success = server.mock(|when, then| {
            when.method(POST).path("/bls").body_contains("key-two");
            then.status(200)
                .header("Content-Type", "application/json")
                .body(BLS_BODY);
        });

        let table = Economics::bls_series_at(
            &server.url("/bls"),
            &["CUUR0000SA0"],
            "2024",
            "2024",
            &["key-one", "key-two"],
        )
        .await
        .unwrap();

        threshold.assert();
        success.assert();
        assert_eq!(table.get_data().unwrap().len(), 2);
    }

    #[test]
    fn bea_table_extracts_fields() {
        let body = r#"{"BEAAPI": {"Results": {"Data": [
            {"DataValue": "75000", "TimePeriod": "2023Q4", "GeoName": "Colorado",
             "CL_UNIT": "USD", "UNIT_MULT": "6"}
        ]}}}"#;

        let table = Economics::bea_gdp_table(body).unwrap();
        let rows = table.get_data().unwrap();
        assert_eq!(rows[0], vec!["75000", "2023Q4", "Colorado", "USD", "6"]);
    }

    #[test]
    fn distance_nyc_to_la_is_about_2445_miles() {
        let miles = Geography::calculate_distance(40.7128, -74.0060, 34.0522, -118.2437);
        assert!(miles > 2400.0 && miles < 2500.0, "got {}", miles);
    }

    #[test]
    fn parse_scores_reads_all_three() {
        let body = r#"{"walkscore": 88, "bike": {"score": 70}, "transit": {"score": 65}}"#;
        let (bike, transit, walk) = Geography::parse_scores(body).unwrap();
        assert_eq!((bike, transit, walk), (70.0, 65.0, 88.0));
    }
}
