// stat_utils.rs
use crate::analytics_utils::{aggregate, format_num, parse_f64};
use crate::table_utils::TableBuilder;
use crate::text_utils::Blob;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::collections::HashMap;
use std::error::Error;

/// Functions for descriptive statistics.
pub struct Desc;

impl Desc {
    /// Creates a table of aggregations (`sum`, `mean`, `min`, `max`, `count`) over
    /// dimension groups: one output row per distinct dimension combination, one
    /// `<col>_<kpi>` column per requested aggregation.
    pub fn group_stats(
        table: &TableBuilder,
        dim_cols: &[&str],
        aggs: &[(&str, &str)],
    ) -> TableBuilder {
        let dim_idxs: Vec<Option<usize>> = dim_cols.iter().map(|d| table.column_index(d)).collect();
        let agg_idxs: Vec<Option<usize>> =
            aggs.iter().map(|(col, _)| table.column_index(col)).collect();

        let empty: Vec<Vec<String>> = Vec::new();
        let rows = table.get_data().unwrap_or(&empty);

        let mut grouped: HashMap<Vec<String>, Vec<&Vec<String>>> = HashMap::new();
        for row in rows {
            let key: Vec<String> = dim_idxs
                .iter()
                .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                .collect();
            grouped.entry(key).or_default().push(row);
        }

        let mut headers: Vec<String> = dim_cols.iter().map(|d| d.to_string()).collect();
        headers.extend(aggs.iter().map(|(col, kpi)| format!("{}_{}", col, kpi)));

        let mut keys: Vec<Vec<String>> = grouped.keys().cloned().collect();
        keys.sort();

        let out_rows: Vec<Vec<String>> = keys
            .iter()
            .map(|key| {
                let members = &grouped[key];
                let mut out_row = key.clone();
                for ((_, kpi), idx) in aggs.iter().zip(agg_idxs.iter()) {
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
}

/// Functions for implementing statistical tests.
pub struct Test;

impl Test {
    /// Welch's two-sample t-test: returns the t statistic and the
    /// Welch-Satterthwaite degrees of freedom.
    pub fn welch_t(sample1: &[f64], sample2: &[f64]) -> Result<(f64, f64), Box<dyn Error>> {
        if sample1.len() < 2 || sample2.len() < 2 {
            return Err("Each sample needs at least two observations".into());
        }

        let n1 = sample1.len() as f64;
        let n2 = sample2.len() as f64;
        let m1 = sample1.iter().sum::<f64>() / n1;
        let m2 = sample2.iter().sum::<f64>() / n2;
        let v1 = sample1.iter().map(|x| (x - m1).powi(2)).sum::<f64>() / (n1 - 1.0);
        let v2 = sample2.iter().map(|x| (x - m2).powi(2)).sum::<f64>() / (n2 - 1.0);

        let se1 = v1 / n1;
        let se2 = v2 / n2;
        let t = (m1 - m2) / (se1 + se2).sqrt();
        let df = (se1 + se2).powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));

        Ok((t, df))
    }

    /// Welch's t-test over two pasted numeric blobs.
    pub fn ttest_result(
        sample1_blob: &str,
        sample2_blob: &str,
    ) -> Result<(f64, f64), Box<dyn Error>> {
        let (p1, p2) = Blob::text_parse(sample1_blob, sample2_blob)?;
        Self::welch_t(&p1, &p2)
    }

    /// Pearson correlation between two equal-length samples.
    pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, Box<dyn Error>> {
        if x.len() != y.len() || x.len() < 2 {
            return Err("Samples must be the same length with at least two observations".into());
        }

        let n = x.len() as f64;
        let mx = x.iter().sum::<f64>() / n;
        let my = y.iter().sum::<f64>() / n;

        let cov: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum::<f64>().sqrt();
        let sy: f64 = y.iter().map(|b| (b - my).powi(2)).sum::<f64>().sqrt();

        if sx == 0.0 || sy == 0.0 {
            return Err("Zero variance sample".into());
        }

        Ok(cov / (sx * sy))
    }

    /// Pearson correlation over two pasted numeric blobs.
    pub fn correlation(
        sample1_blob: &str,
        sample2_blob: &str,
    ) -> Result<f64, Box<dyn Error>> {
        let (p1, p2) = Blob::text_parse(sample1_blob, sample2_blob)?;
        Self::pearson_correlation(&p1, &p2)
    }

    /// Bias-corrected Cramer's V association between two categorical columns.
    pub fn cramers_v(cat_col1: &[String], cat_col2: &[String]) -> Result<f64, Box<dyn Error>> {
        if cat_col1.len() != cat_col2.len() || cat_col1.is_empty() {
            return Err("Columns must be the same non-zero length".into());
        }

        let mut observed: HashMap<(String, String), f64> = HashMap::new();
        let mut row_totals: HashMap<String, f64> = HashMap::new();
        let mut col_totals: HashMap<String, f64> = HashMap::new();
        for (a, b) in cat_col1.iter().zip(cat_col2.iter()) {
            *observed.entry((a.clone(), b.clone())).or_default() += 1.0;
            *row_totals.entry(a.clone()).or_default() += 1.0;
            *col_totals.entry(b.clone()).or_default() += 1.0;
        }

        let n = cat_col1.len() as f64;
        let mut chi2 = 0.0;
        for (a, row_total) in &row_totals {
            for (b, col_total) in &col_totals {
                let expected = row_total * col_total / n;
                let obs = observed.get(&(a.clone(), b.clone())).copied().unwrap_or(0.0);
                chi2 += (obs - expected).powi(2) / expected;
            }
        }

        let r = row_totals.len() as f64;
        let k = col_totals.len() as f64;
        let phi2 = chi2 / n;
        let phi2corr = (phi2 - (k - 1.0) * (r - 1.0) / (n - 1.0)).max(0.0);
        let rcorr = r - (r - 1.0).powi(2) / (n - 1.0);
        let kcorr = k - (k - 1.0).powi(2) / (n - 1.0);

        Ok((phi2corr / (kcorr - 1.0).min(rcorr - 1.0)).sqrt())
    }

    /// Calculates the sample size per arm needed to detect a move from a baseline
    /// rate to an expected rate at the given two-sided significance level and power.
    pub fn sample_size(
        baseline_rate: f64,
        expected_rate: f64,
        significance_level: f64,
        statistical_power: f64,
    ) -> Result<u64, Box<dyn Error>> {
        if baseline_rate == expected_rate {
            return Err("Baseline and expected rates must differ".into());
        }

        let z = probit(1.0 - significance_level / 2.0);
        let zp = probit(statistical_power);
        let d = baseline_rate - expected_rate;
        let pooled = (baseline_rate + expected_rate) / 2.0;
        let s = 2.0 * pooled * (1.0 - pooled);
        let n = s * (zp + z).powi(2) / d.powi(2);

        Ok(n.round() as u64)
    }

    /// Arc price elasticity from a before/after price-quantity observation.
    pub fn price_elasticity_arc(
        original_quantity: f64,
        new_quantity: f64,
        original_price: f64,
        new_price: f64,
    ) -> f64 {
        ((new_quantity - original_quantity) / (new_quantity + original_quantity))
            / ((new_price - original_price) / (new_price + original_price))
    }

    /// Price elasticity estimated as the slope of a log-log regression over sampled
    /// price/quantity observations.
    pub fn price_elasticity_sample(
        prices: &[f64],
        quantities: &[f64],
    ) -> Result<f64, Box<dyn Error>> {
        if prices.len() != quantities.len() || prices.len() < 2 {
            return Err("Samples must be the same length with at least two observations".into());
        }

        let train_rows: Vec<Vec<f64>> = prices.iter().map(|p| vec![p.ln()]).collect();
        let train_slices: Vec<&[f64]> = train_rows.iter().map(|r| r.as_slice()).collect();
        let x = DenseMatrix::from_2d_array(&train_slices);
        let y: Vec<f64> = quantities.iter().map(|q| q.ln()).collect();

        let lr = LinearRegression::fit(
            &x,
            &y,
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::QR),
        )
        .map_err(|e| Box::<dyn Error>::from(e.to_string()))?;

        // slope read off two probe points one log-unit apart
        let x0 = train_rows[0][0];
        let probe_rows = vec![vec![x0], vec![x0 + 1.0]];
        let probe_slices: Vec<&[f64]> = probe_rows.iter().map(|r| r.as_slice()).collect();
        let probe = DenseMatrix::from_2d_array(&probe_slices);
        let predictions = lr
            .predict(&probe)
            .map_err(|e| Box::<dyn Error>::from(e.to_string()))?;

        Ok(predictions[1] - predictions[0])
    }
}

/// Inverse standard normal CDF (Acklam's rational approximation).
fn probit(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];

    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_stats_aggregates_per_group() {
        let table = TableBuilder::from_raw_data(
            vec!["region".to_string(), "revenue".to_string()],
            vec![
                vec!["east".to_string(), "10".to_string()],
                vec!["east".to_string(), "20".to_string()],
                vec!["west".to_string(), "5".to_string()],
            ],
        );

        let out = Desc::group_stats(&table, &["region"], &[("revenue", "sum"), ("revenue", "mean")]);
        assert_eq!(
            out.get_headers().unwrap(),
            &vec![
                "region".to_string(),
                "revenue_sum".to_string(),
                "revenue_mean".to_string(),
            ]
        );
        assert_eq!(out.get_data().unwrap(), &vec![
            vec!["east".to_string(), "30".to_string(), "15".to_string()],
            vec!["west".to_string(), "5".to_string(), "5".to_string()],
        ]);
    }

    #[test]
    fn welch_t_matches_hand_computation() {
        let s1 = [1.0, 2.0, 3.0, 4.0, 5.0];
        let s2 = [2.0, 3.0, 4.0, 5.0, 6.0];
        let (t, df) = Test::welch_t(&s1, &s2).unwrap();
        assert!((t + 1.0).abs() < 1e-12);
        assert!((df - 8.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_correlation_of_linear_data_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        let r = Test::pearson_correlation(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_parses_blobs() {
        let r = Test::correlation("1,2,3", "3,2,1").unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn cramers_v_of_perfect_association_is_one() {
        let a: Vec<String> = ["a", "a", "b", "b"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["x", "x", "y", "y"].iter().map(|s| s.to_string()).collect();
        let v = Test::cramers_v(&a, &b).unwrap();
        assert!((v - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sample_size_for_two_point_lift() {
        // 10% -> 12% at alpha 0.05, power 0.8
        let n = Test::sample_size(0.10, 0.12, 0.05, 0.80).unwrap();
        assert_eq!(n, 3842);
    }

    #[test]
    fn arc_elasticity_sign_and_magnitude() {
        let pe = Test::price_elasticity_arc(100.0, 80.0, 10.0, 12.0);
        assert!((pe + 1.2222222222).abs() < 1e-9);
    }

    #[test]
    fn sample_elasticity_recovers_power_law_exponent() {
        let prices: [f64; 4] = [1.0, 2.0, 4.0, 8.0];
        let quantities: Vec<f64> = prices.iter().map(|p| 100.0 * p.powf(-1.5)).collect();
        let pe = Test::price_elasticity_sample(&prices, &quantities).unwrap();
        assert!((pe + 1.5).abs() < 1e-6, "got {}", pe);
    }

    #[test]
    fn probit_matches_known_quantiles() {
        assert!((probit(0.975) - 1.959964).abs() < 1e-4);
        assert!((probit(0.8) - 0.841621).abs() < 1e-4);
        assert!((probit(0.5)).abs() < 1e-9);
    }
}
