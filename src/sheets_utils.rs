// sheets_utils.rs
use std::error::Error;
use url::Url;

/// Functions for retrieving data from publicly viewable Google Sheets.
pub struct GoogleSheets;

impl GoogleSheets {
    /// Converts a viewable Google Sheet URL into its CSV export endpoint. The gid is
    /// taken from the URL fragment or query, defaulting to the first tab.
    pub fn export_url(url: &str) -> Result<String, Box<dyn Error>> {
        let parsed = Url::parse(url)?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();
        let doc_id = segments
            .iter()
            .position(|s| *s == "d")
            .and_then(|i| segments.get(i + 1))
            .ok_or("No spreadsheet id found in URL")?;

        let gid = parsed
            .fragment()
            .and_then(|f| f.strip_prefix("gid="))
            .map(|g| g.to_string())
            .or_else(|| {
                parsed
                    .query_pairs()
                    .find(|(k, _)| k == "gid")
                    .map(|(_, v)| v.to_string())
            })
            .unwrap_or_else(|| "0".to_string());

        Ok(format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
            doc_id, gid
        ))
    }

    /// Parses a CSV body into headers and rows.
    pub fn parse_csv_body(body: &str) -> Result<(Vec<String>, Vec<Vec<String>>), Box<dyn Error>> {
        let mut rdr = csv::Reader::from_reader(body.as_bytes());

        let headers = rdr.headers()?.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(String::from).collect());
        }

        Ok((headers, rows))
    }

    /// Fetches a publicly viewable Google Sheet as headers and rows.
    pub async fn get_sheet_data(
        url: &str,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), Box<dyn Error>> {
        let export = Self::export_url(url)?;

        let body = reqwest::Client::new()
            .get(&export)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Self::parse_csv_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_url_reads_id_and_fragment_gid() {
        let url = "https://docs.google.com/spreadsheets/d/1U9ozNFwV_abc/edit#gid=272498272";
        assert_eq!(
            GoogleSheets::export_url(url).unwrap(),
            "https://docs.google.com/spreadsheets/d/1U9ozNFwV_abc/export?format=csv&gid=272498272"
        );
    }

    #[test]
    fn export_url_defaults_gid_to_zero() {
        let url = "https://docs.google.com/spreadsheets/d/1U9ozNFwV_abc/edit";
        assert!(GoogleSheets::export_url(url).unwrap().ends_with("gid=0"));
    }

    #[test]
    fn export_url_rejects_non_sheet_urls() {
        assert!(GoogleSheets::export_url("https://example.com/nothing").is_err());
    }

    #[test]
    fn parse_csv_body_splits_headers_and_rows() {
        let (headers, rows) = GoogleSheets::parse_csv_body("a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(headers, vec!["a", "b"]);
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }
}
