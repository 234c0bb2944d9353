// cloud_utils.rs
use crate::table_utils::TableBuilder;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::DateTime;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Functions for interacting with AWS S3 object storage.
pub struct AwsS3;

impl AwsS3 {
    /// Creates an S3 client from explicit credentials. No environment lookups: pass
    /// the key pair and region at the call site.
    pub fn make_client(key_id: &str, secret_key: &str, region: &str) -> Client {
        let credentials = Credentials::new(
            key_id.to_string(),
            secret_key.to_string(),
            None,
            None,
            "FusetoolsStaticCredentials",
        );

        let config = aws_sdk_s3::Config::builder()
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .behavior_version(BehaviorVersion::latest())
            .build();

        Client::from_conf(config)
    }

    /// Uploads a local file to a bucket key.
    pub async fn upload_file(
        client: &Client,
        bucket: &str,
        key: &str,
        file_path: &str,
    ) -> Result<(), Box<dyn Error>> {
        let body = ByteStream::from_path(Path::new(file_path)).await?;

        client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;

        println!("Uploaded {} to s3://{}/{}", file_path, bucket, key);
        Ok(())
    }

    /// Downloads a bucket key to a local file.
    pub async fn download_file(
        client: &Client,
        bucket: &str,
        key: &str,
        sav_path: &str,
    ) -> Result<(), Box<dyn Error>> {
        let response = client.get_object().bucket(bucket).key(key).send().await?;

        let data = response.body.collect().await?;
        fs::write(sav_path, data.into_bytes())?;

        println!("Downloaded s3://{}/{} to {}", bucket, key, sav_path);
        Ok(())
    }

    /// Lists a bucket's objects (optionally under a prefix) as a table of key, size
    /// and last-modified, following continuation tokens until the listing is
    /// exhausted.
    pub async fn list_objects(
        client: &Client,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = client.list_objects_v2().bucket(bucket);
            if let Some(p) = prefix {
                request = request.prefix(p);
            }
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request.send().await?;

            for object in response.contents() {
                let last_modified = object
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), 0))
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();

                rows.push(vec![
                    object.key().unwrap_or("").to_string(),
                    object.size().map(|s| s.to_string()).unwrap_or_default(),
                    last_modified,
                ]);
            }

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(TableBuilder::from_raw_data(
            vec![
                "key".to_string(),
                "size".to_string(),
                "last_modified".to_string(),
            ],
            rows,
        ))
    }

    /// Deletes a bucket key.
    pub async fn delete_object(
        client: &Client,
        bucket: &str,
        key: &str,
    ) -> Result<(), Box<dyn Error>> {
        client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;

        println!("Deleted s3://{}/{}", bucket, key);
        Ok(())
    }
}
