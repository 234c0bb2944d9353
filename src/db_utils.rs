// db_utils.rs
use crate::api_utils::RetryPolicy;
use crate::etl_utils::{SqlBuild, SqlDialect};
use crate::table_utils::TableBuilder;
use chrono::{NaiveDate, NaiveDateTime};
use futures::StreamExt;
use mysql_async::{prelude::*, OptsBuilder, Params, Pool, Row as MySqlRow, Value as MySqlValue};
use std::error::Error;
use std::time::Instant;
use tiberius::{error::Error as MssqlError, AuthMethod, Client, ColumnType, Config, QueryItem, Row};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use uuid::Uuid;

// Renders a typed MSSQL cell to a string, empty on NULL or extraction failure.
macro_rules! cell_to_string {
    ($row:expr, $i:expr, $t:ty) => {
        $row.try_get::<$t, _>($i)
            .ok()
            .flatten()
            .map(|v| v.to_string())
            .unwrap_or_default()
    };
}

/// Represents a database connection manager for handling database operations
pub struct DbConnect;

impl DbConnect {
    /// Executes an SQL query against a Microsoft SQL Server database and returns the
    /// headers and rows, with every cell rendered to a string.
    pub async fn execute_mssql_query(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), Box<dyn Error>> {
        async fn create_mssql_connection(
            username: &str,
            password: &str,
            server: &str,
            database: &str,
        ) -> Result<Client<Compat<TcpStream>>, Box<dyn Error>> {
            let mut config = Config::new();
            config.host(server);
            config.database(database);
            config.port(1433);
            config.authentication(AuthMethod::sql_server(username, password));
            config.trust_cert();

            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;

            let compat_tcp = tcp.compat_write();

            let client = match Client::connect(config, compat_tcp).await {
                Ok(client) => client,
                Err(MssqlError::Routing { host, port }) => {
                    let mut config = Config::new();
                    config.host(&host);
                    config.port(port);
                    config.authentication(AuthMethod::sql_server(username, password));

                    let tcp = TcpStream::connect(config.get_addr()).await?;
                    tcp.set_nodelay(true)?;

                    let compat_tcp = tcp.compat_write();

                    Client::connect(config, compat_tcp).await?
                }
                Err(e) => return Err(e.into()),
            };

            Ok(client)
        }

        fn extract_row_values(row: &Row) -> Vec<String> {
            (0..row.columns().len())
                .map(|i| match row.columns()[i].column_type() {
                    ColumnType::Int1 => cell_to_string!(row, i, u8),
                    ColumnType::Int2 => cell_to_string!(row, i, i16),
                    ColumnType::Int4 => cell_to_string!(row, i, i32),
                    ColumnType::Int8 => cell_to_string!(row, i, i64),
                    ColumnType::Intn => {
                        if let Ok(Some(value)) = row.try_get::<i64, _>(i) {
                            value.to_string()
                        } else if let Ok(Some(value)) = row.try_get::<i32, _>(i) {
                            value.to_string()
                        } else if let Ok(Some(value)) = row.try_get::<i16, _>(i) {
                            value.to_string()
                        } else if let Ok(Some(value)) = row.try_get::<u8, _>(i) {
                            value.to_string()
                        } else {
                            "".to_string()
                        }
                    }
                    ColumnType::Float4 => cell_to_string!(row, i, f32),
                    ColumnType::Float8 | ColumnType::Money | ColumnType::Money4 => {
                        cell_to_string!(row, i, f64)
                    }
                    ColumnType::Bit => cell_to_string!(row, i, bool),
                    ColumnType::BigVarChar
                    | ColumnType::BigChar
                    | ColumnType::NVarchar
                    | ColumnType::NChar
                    | ColumnType::Text
                    | ColumnType::NText
                    | ColumnType::Xml => cell_to_string!(row, i, &str),
                    ColumnType::Datetime
                    | ColumnType::Datetime2
                    | ColumnType::Datetimen
                    | ColumnType::Daten
                    | ColumnType::Timen
                    | ColumnType::DatetimeOffsetn => match row.try_get::<NaiveDateTime, _>(i) {
                        Ok(Some(naive_datetime)) => {
                            naive_datetime.format("%Y-%m-%d %H:%M:%S").to_string()
                        }
                        Ok(None) => "".to_string(),
                        Err(_) => match row.try_get::<NaiveDate, _>(i) {
                            Ok(Some(naive_date)) => naive_date.format("%Y-%m-%d").to_string(),
                            _ => "".to_string(),
                        },
                    },
                    ColumnType::Guid => cell_to_string!(row, i, Uuid),
                    _ => "".to_string(),
                })
                .collect()
        }

        let mut client = create_mssql_connection(username, password, server, database).await?;

        let mut stream = client.simple_query(sql_query).await?;

        let mut headers: Vec<String> = Vec::new();
        let mut data: Vec<Vec<String>> = Vec::new();

        while let Some(query_item_result) = stream.next().await {
            match query_item_result {
                Ok(QueryItem::Row(row)) => {
                    if headers.is_empty() {
                        headers = row
                            .columns()
                            .iter()
                            .map(|col| col.name().to_string())
                            .collect();
                    }
                    data.push(extract_row_values(&row));
                }
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok((headers, data))
    }

    /// Executes a read-only SQL query against a MySQL database and returns the
    /// headers and rows.
    pub async fn execute_mysql_query(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), Box<dyn Error>> {
        let builder = OptsBuilder::default()
            .user(Some(username))
            .pass(Some(password))
            .ip_or_hostname(server)
            .db_name(Some(database));

        let pool = Pool::new(builder);
        let mut conn = pool.get_conn().await?;

        let result: Vec<MySqlRow> = conn.query(sql_query).await?;

        let mut headers = Vec::new();
        let mut data = Vec::new();

        if let Some(first_row) = result.first() {
            headers = first_row
                .columns_ref()
                .iter()
                .map(|col| col.name_str().to_string())
                .collect::<Vec<String>>();
        }

        for row in result {
            let row_data = (0..headers.len())
                .map(|i| match row.get_opt::<String, usize>(i) {
                    Some(Ok(value)) => value,
                    _ => String::from("NULL"),
                })
                .collect::<Vec<String>>();
            data.push(row_data);
        }

        drop(conn);
        pool.disconnect().await?;

        Ok((headers, data))
    }

    /// Executes a data-writable SQL query against a MySQL database.
    pub async fn execute_mysql_write(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<(), Box<dyn Error>> {
        let opts = OptsBuilder::default()
            .user(Some(username.to_string()))
            .pass(Some(password.to_string()))
            .ip_or_hostname(server.to_string())
            .db_name(Some(database.to_string()));

        let pool = Pool::new(opts);

        let mut conn = pool.get_conn().await?;
        conn.exec_drop(sql_query, ()).await?;

        drop(conn);
        pool.disconnect().await?;

        Ok(())
    }

    /// Executes a write statement and prints the elapsed runtime in minutes.
    pub async fn run_query_timed(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        sql_query: &str,
    ) -> Result<(), Box<dyn Error>> {
        let started = Instant::now();
        Self::execute_mysql_write(username, password, server, database, sql_query).await?;
        println!("Runtime: {}", started.elapsed().as_secs_f64() / 60.0);
        Ok(())
    }

    /// Inserts a table's rows into a MySQL table via chunked parameterized INSERTs,
    /// retrying each chunk per the supplied policy.
    pub async fn insert_table_mysql(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        table: &TableBuilder,
        tbl_name: &str,
        chunks: usize,
        retry: &RetryPolicy,
    ) -> Result<(), Box<dyn Error>> {
        let headers = table.get_headers().ok_or("No headers to insert")?;
        let data = table.get_data().ok_or("No data to insert")?;

        let cols = SqlBuild::make_db_cols(headers);
        let insert_sql = SqlBuild::insert_placeholder_sql(tbl_name, &cols, SqlDialect::MySql);
        println!("{}", insert_sql);

        let chunk_count = chunks.max(1);
        let chunk_size = ((data.len() + chunk_count - 1) / chunk_count).max(1);
        let total_batches = (data.len() + chunk_size - 1) / chunk_size;

        let opts = OptsBuilder::default()
            .user(Some(username.to_string()))
            .pass(Some(password.to_string()))
            .ip_or_hostname(server.to_string())
            .db_name(Some(database.to_string()));
        let pool = Pool::new(opts);
        let mut conn = pool.get_conn().await?;

        for (batch_idx, chunk) in data.chunks(chunk_size).enumerate() {
            let mut attempt = 0;
            loop {
                let params_iter = chunk.iter().map(|row| {
                    Params::Positional(
                        row.iter()
                            .map(|cell| MySqlValue::from(cell.as_str()))
                            .collect(),
                    )
                });

                match conn.exec_batch(insert_sql.as_str(), params_iter).await {
                    Ok(()) => break,
                    Err(e) if attempt + 1 < retry.max_attempts => {
                        println!(
                            "Failed upload attempt ({})...{} remaining.",
                            e,
                            retry.max_attempts - attempt - 1
                        );
                        sleep(retry.delay_for(attempt)).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            println!("Completed batch {} of {}", batch_idx + 1, total_batches);
        }

        drop(conn);
        pool.disconnect().await?;

        Ok(())
    }

    /// Drops, recreates (with an inferred schema) and loads a MySQL table from
    /// tabular data, printing each statement along the way.
    pub async fn make_tbl_complete_mysql(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
        table: &TableBuilder,
        tbl_name: &str,
        chunks: usize,
        retry: &RetryPolicy,
    ) -> Result<(), Box<dyn Error>> {
        if !table.has_data() {
            return Ok(());
        }

        println!("dropping table: {}", tbl_name);
        if let Err(e) = Self::execute_mysql_write(
            username,
            password,
            server,
            database,
            &format!("drop table {}", tbl_name),
        )
        .await
        {
            println!("table doesn't exist: {} ({})", tbl_name, e);
        }

        println!("creating table: {}", tbl_name);
        let create_sql = SqlBuild::make_tbl_sql(tbl_name, table, SqlDialect::MySql);
        println!("{}", create_sql);
        Self::execute_mysql_write(username, password, server, database, &create_sql).await?;

        println!("inserting values into table: {}", tbl_name);
        let started = Instant::now();
        Self::insert_table_mysql(
            username, password, server, database, table, tbl_name, chunks, retry,
        )
        .await?;
        println!("Runtime: {}", started.elapsed().as_secs_f64() / 60.0);

        Ok(())
    }

    /// Retrieves and lists databases on the MySQL server.
    pub async fn print_mysql_databases(
        username: &str,
        password: &str,
        server: &str,
        default_database: &str,
    ) -> Result<(), Box<dyn Error>> {
        let db_query = "SHOW DATABASES WHERE `Database` NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')";
        let mut databases_result =
            TableBuilder::from_mysql_query(username, password, server, default_database, db_query)
                .await?;
        databases_result.print_table_all_rows();

        Ok(())
    }

    /// Retrieves and lists tables within a MySQL database.
    pub async fn print_mysql_tables(
        username: &str,
        password: &str,
        server: &str,
        database: &str,
    ) -> Result<(), Box<dyn Error>> {
        let table_query = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = '{}' AND TABLE_TYPE = 'BASE TABLE'",
            database
        );

        let mut tables_result =
            TableBuilder::from_mysql_query(username, password, server, database, &table_query)
                .await?;
        tables_result.print_table_all_rows();

        Ok(())
    }

    /// Retrieves and lists column descriptions for a MySQL table.
    pub async fn print_mysql_table_description(
        username: &str,
        password: &str,
        server: &str,
        in_focus_database: &str,
        table_name: &str,
    ) -> Result<(), Box<dyn Error>> {
        let column_query = format!(
            "SHOW FULL COLUMNS FROM {}.{}",
            in_focus_database, table_name
        );

        let mut columns_result = TableBuilder::from_mysql_query(
            username,
            password,
            server,
            in_focus_database,
            &column_query,
        )
        .await?;
        columns_result
            .retain_columns(vec![
                "Field",
                "Type",
                "Null",
                "Default",
                "Extra",
                "Collation",
            ])
            .print_table_all_rows();

        Ok(())
    }

    /// Walks the MySQL server: lists databases, then the tables of each.
    pub async fn print_mysql_architecture(
        username: &str,
        password: &str,
        server: &str,
        default_database: &str,
    ) -> Result<(), Box<dyn Error>> {
        let db_query = "SHOW DATABASES WHERE `Database` NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')";
        let databases_result =
            TableBuilder::from_mysql_query(username, password, server, default_database, db_query)
                .await?;

        let databases: Vec<String> = match databases_result.get_data() {
            Some(data) => data
                .iter()
                .filter_map(|row| row.first().cloned())
                .collect(),
            None => return Err("No data returned from query".into()),
        };

        Self::print_mysql_databases(username, password, server, default_database).await?;
        println!();
        for database in databases {
            println!("+{:=<width$}+", "", width = database.len() + 2);
            println!("| {} |", database);
            println!("+{:=<width$}+", "", width = database.len() + 2);

            if let Err(err) = Self::print_mysql_tables(username, password, server, &database).await
            {
                eprintln!("\nError listing tables for {}: {}", database, err);
            }
            println!();
            println!();
        }

        Ok(())
    }

    /// Retrieves and lists databases on the MSSQL server.
    pub async fn print_mssql_databases(
        username: &str,
        password: &str,
        server: &str,
        default_database: &str,
    ) -> Result<(), Box<dyn Error>> {
        let db_query = "SELECT name FROM sys.databases WHERE name NOT IN ('master', 'tempdb', 'model', 'msdb')";
        let mut databases_result =
            TableBuilder::from_mssql_query(username, password, server, default_database, db_query)
                .await?;
        databases_result.print_table_all_rows();

        Ok(())
    }

    /// Retrieves and lists tables from a schema within an MSSQL database.
    pub async fn print_mssql_tables(
        username: &str,
        password: &str,
        server: &str,
        in_focus_database: &str,
        schema: &str,
    ) -> Result<(), Box<dyn Error>> {
        let effective_schema = if schema.is_empty() { "dbo" } else { schema };

        let table_query = format!(
            "SELECT TABLE_NAME FROM {}.INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = '{}' AND TABLE_TYPE = 'BASE TABLE'",
            in_focus_database, effective_schema
        );

        let mut tables_result = TableBuilder::from_mssql_query(
            username,
            password,
            server,
            in_focus_database,
            &table_query,
        )
        .await?;
        tables_result.print_table_all_rows();

        Ok(())
    }

    /// Retrieves and lists column descriptions for an MSSQL table.
    pub async fn print_mssql_table_description(
        username: &str,
        password: &str,
        server: &str,
        in_focus_database: &str,
        table_name: &str,
    ) -> Result<(), Box<dyn Error>> {
        let column_query = format!(
            "SELECT COLUMN_NAME, IS_NULLABLE, DATA_TYPE, CHARACTER_MAXIMUM_LENGTH, COLLATION_NAME \
             FROM {}.INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = '{}'",
            in_focus_database, table_name
        );

        let mut columns_result = TableBuilder::from_mssql_query(
            username,
            password,
            server,
            in_focus_database,
            &column_query,
        )
        .await?;
        columns_result.print_table_all_rows();

        Ok(())
    }

    /// Walks the MSSQL server: lists databases, then the dbo tables of each.
    pub async fn print_mssql_architecture(
        username: &str,
        password: &str,
        server: &str,
        default_database: &str,
    ) -> Result<(), Box<dyn Error>> {
        let db_query = "SELECT name FROM sys.databases WHERE name NOT IN ('master', 'tempdb', 'model', 'msdb')";
        let databases_result =
            TableBuilder::from_mssql_query(username, password, server, default_database, db_query)
                .await?;

        let databases: Vec<String> = match databases_result.get_data() {
            Some(data) => data
                .iter()
                .filter_map(|row| row.first().cloned())
                .collect(),
            None => return Err("No data returned from query".into()),
        };

        Self::print_mssql_databases(username, password, server, default_database).await?;
        println!();
        for database in databases {
            println!("+{:=<width$}+", "", width = database.len() + 2);
            println!("| {} |", database);
            println!("+{:=<width$}+", "", width = database.len() + 2);

            if let Err(err) =
                Self::print_mssql_tables(username, password, server, &database, "dbo").await
            {
                eprintln!("\nError listing tables for {}: {}", database, err);
            }
            println!();
            println!();
        }

        Ok(())
    }
}
