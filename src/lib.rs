// lib.rs
//! # FUSETOOLS
//!
//! A toolbox of thin Rust wrappers around SaaS and cloud vendor APIs, oriented around
//! moving data into and out of a tabular representation. Every module is an independent
//! namespace of stateless functions: pass credentials and request parameters in, get a
//! table (or a vendor response) back. Nothing here owns long-lived state; connections,
//! tokens and sessions are created by the caller and passed explicitly.
//!
//! ## `table_utils`
//!
//! - **Purpose**: The tabular core every other module feeds into.
//! - **Features**:
//!   - **TableBuilder**: headers + string rows, loadable from CSV/XLSX files, JSON
//!     record arrays, MySQL/MSSQL queries and publicly viewable Google Sheets.
//!   - Chainable column/row manipulation, de-duplication, sorting and limits.
//!   - Boxed terminal printing and CSV export.
//!   - **TableConverter**: JSON string to CSV file conversion.
//!
//! ## `api_utils`
//!
//! - **Purpose**: Gracefully make and cache API calls.
//! - **Features**:
//!   - **ApiCallBuilder**: method/url/headers/payload call construction, response
//!     caching with a freshness window, and an explicit `RetryPolicy` (max attempts,
//!     exponential backoff, jitter) instead of ad hoc sleep loops.
//!
//! ## `etl_utils`
//!
//! - **Purpose**: Dynamic SQL text generation for ETL against Postgres, Redshift,
//!   MySQL, Teradata and Oracle.
//! - **Features**:
//!   - Column-name sanitization for database standards.
//!   - CREATE TABLE schema inference from tabular data.
//!   - INSERT (placeholder and literal-value) statements.
//!   - UPSERT simulation for engines without native MERGE.
//!   - Sequential date-range load windows with monthly-to-weekly fallback.
//!
//! ## `analytics_utils`
//!
//! - **Purpose**: Analytical comparison queries and tabular computations.
//! - **Features**:
//!   - Year-over-year cumulative/snapshot comparison SQL.
//!   - Week-over-week rank-offset comparison SQL.
//!   - Period comparison, windowed aggregation and period-to-date measures over
//!     `TableBuilder` data.
//!
//! ## `date_utils`
//!
//! - **Purpose**: Reporting-calendar arithmetic (week/month/quarter/year keys).
//!
//! ## `db_utils`
//!
//! - **Purpose**: Query execution against MySQL and Microsoft SQL Server, plus
//!   schema/architecture exploration printers and chunked table loads.
//!
//! ## `cloud_utils`
//!
//! - **Purpose**: AWS S3 object storage (upload, download, paginated listing, delete).
//!
//! ## `sheets_utils`
//!
//! - **Purpose**: Fetch publicly viewable Google Sheets as tabular data.
//!
//! ## `finance_utils`
//!
//! - **Purpose**: Market quote retrieval from Alphavantage and Yahoo Finance,
//!   including concurrent multi-ticker fetches.
//!
//! ## `research_utils`
//!
//! - **Purpose**: Economic series (BLS, BEA) and geographic helpers.
//!
//! ## `comm_utils`
//!
//! - **Purpose**: Messaging via Twilio (SMS/MMS/WhatsApp) and SendGrid email.
//!
//! ## `transfer_utils`
//!
//! - **Purpose**: Files in motion: zip archives, directory housekeeping,
//!   newest-file lookups, bulk file reads and HTTP downloads.
//!
//! ## `text_utils`
//!
//! - **Purpose**: Text artifact export (.sql/.json dumps, concatenation,
//!   find-and-replace) and numeric blob parsing.
//!
//! ## `stat_utils`
//!
//! - **Purpose**: Descriptive group statistics, two-sample tests, correlation,
//!   sample sizing and price elasticity.
//!
//! ## `log_utils`
//!
//! - **Purpose**: Console and file logging initialization.
//!
//! ## `web_utils`
//!
//! - **Purpose**: URL utilities (Bitly shortening).
//!
//! ## License
//!
//! This project is licensed under the MIT License - see the LICENSE file for details.

pub mod analytics_utils;
pub mod api_utils;
pub mod cloud_utils;
pub mod comm_utils;
pub mod date_utils;
pub mod db_utils;
pub mod etl_utils;
pub mod finance_utils;
pub mod log_utils;
pub mod research_utils;
pub mod sheets_utils;
pub mod stat_utils;
pub mod table_utils;
pub mod text_utils;
pub mod transfer_utils;
pub mod web_utils;
