// transfer_utils.rs
use crate::table_utils::TableBuilder;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

/// Functions for accessing file systems and protocols.
pub struct Access;

impl Access {
    /// Builds an http/https proxy address pair from explicit credentials.
    pub fn proxies(domain: &str, user: &str, password: &str) -> (String, String) {
        (
            format!("http://{}:{}@proxyfarm.{}.com:8080", user, password, domain),
            format!("https://{}:{}@proxyfarm.{}.com:8080", user, password, domain),
        )
    }
}

/// Functions for accessing local files.
pub struct Local;

impl Local {
    /// Zips the given files (flattened to their file names) into an archive.
    pub fn zip_files(zip_file_name: &str, file_paths: &[&str]) -> Result<(), Box<dyn Error>> {
        let file = File::create(zip_file_name)?;
        let mut zip = ZipWriter::new(file);

        for path in file_paths {
            let name = Path::new(path)
                .file_name()
                .ok_or("File path has no file name")?
                .to_string_lossy()
                .to_string();
            zip.start_file::<_, ()>(name, FileOptions::default())?;
            let mut input = File::open(path)?;
            io::copy(&mut input, &mut zip)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Extracts an archive into a destination directory.
    pub fn unzip_file(zip_file_name: &str, dest_dir: &str) -> Result<(), Box<dyn Error>> {
        let mut archive = ZipArchive::new(File::open(zip_file_name)?)?;
        archive.extract(dest_dir)?;
        Ok(())
    }

    /// Recursively empties a directory; `method` "delete" removes the directory
    /// itself afterwards, anything else leaves it in place.
    pub fn clear_delete_directory(directory: &str, method: &str) -> Result<(), Box<dyn Error>> {
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::clear_delete_directory(&path.to_string_lossy(), "delete")?;
            } else {
                fs::remove_file(&path)?;
            }
        }

        if method == "delete" {
            fs::remove_dir(directory)?;
        }

        Ok(())
    }

    /// Creates a table of file names and modification times (epoch seconds) in a
    /// directory, optionally excluding names containing a string.
    pub fn get_all_filetimes(
        dir: &str,
        exclude: Option<&str>,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(excl) = exclude {
                if name.contains(excl) {
                    continue;
                }
            }
            let modified = entry
                .metadata()?
                .modified()?
                .duration_since(UNIX_EPOCH)?
                .as_secs();
            rows.push(vec![name, modified.to_string()]);
        }

        Ok(TableBuilder::from_raw_data(
            vec!["files".to_string(), "times".to_string()],
            rows,
        ))
    }

    /// Gets the most recently modified file in a directory whose (lowercased) name
    /// contains `name`.
    pub fn get_latest_file(
        name: &str,
        dir: &str,
        exclude: Option<&str>,
    ) -> Result<String, Box<dyn Error>> {
        let name = name.to_lowercase();
        let file_times = Self::get_all_filetimes(dir, exclude)?;

        let empty: Vec<Vec<String>> = Vec::new();
        let latest = file_times
            .get_data()
            .unwrap_or(&empty)
            .iter()
            .filter(|row| row[0].to_lowercase().contains(&name))
            .max_by_key(|row| row[1].parse::<u64>().unwrap_or(0))
            .map(|row| row[0].clone());

        latest.ok_or_else(|| "No matching files found".into())
    }

    /// Reads and concatenates all files in a directory whose (lowercased) names
    /// contain `name` and `ext_typ` ("csv" or "xlsx"). Sheet selection applies to
    /// spreadsheet files only.
    pub fn read_files_like(
        name: &str,
        dir: &str,
        ext_typ: &str,
        sheet_name: Option<&str>,
    ) -> Result<TableBuilder, Box<dyn Error>> {
        let name = name.to_lowercase();
        let ext_typ = ext_typ.to_lowercase();

        let mut matches: Vec<String> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|f| {
                let lower = f.to_lowercase();
                lower.contains(&name) && lower.contains(&ext_typ)
            })
            .collect();
        matches.sort();

        let mut combined = TableBuilder::new();
        for file in matches {
            let full_path = format!("{}/{}", dir.trim_end_matches('/'), file);
            let part = if ext_typ == "csv" {
                TableBuilder::from_csv(&full_path)
            } else {
                TableBuilder::from_xlsx(&full_path, sheet_name.unwrap_or("Sheet1"))
            };

            if let Some(e) = part.get_error() {
                return Err(format!("Failed reading {}: {}", full_path, e).into());
            }

            if !combined.has_headers() {
                if let Some(headers) = part.get_headers() {
                    let header_refs: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
                    combined.set_header(header_refs);
                }
            }
            if let Some(rows) = part.get_data() {
                let row_refs: Vec<Vec<&str>> = rows
                    .iter()
                    .map(|r| r.iter().map(|c| c.as_str()).collect())
                    .collect();
                combined.add_rows(row_refs);
            }
        }

        Ok(combined)
    }
}

/// Functions for interacting with files on the Web.
pub struct Web;

impl Web {
    /// Downloads a file from a URL endpoint, writing through a temp file in the
    /// destination directory so a failed download never leaves a partial file.
    pub async fn download_file(sav_path: &str, url: &str) -> Result<(), Box<dyn Error>> {
        println!("Downloading file at: {}", url);

        let response = reqwest::Client::new()
            .get(url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let parent = Path::new(sav_path).parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.persist(sav_path)?;

        Ok(())
    }
}
