// text_utils.rs
use serde_json::Value;
use std::error::Error;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Functions for parsing pasted text blobs.
pub struct Blob;

impl Blob {
    /// Takes two blobs of numeric values (comma, space or line delimited) and returns
    /// the parsed vectors.
    pub fn text_parse(blob1: &str, blob2: &str) -> Result<(Vec<f64>, Vec<f64>), Box<dyn Error>> {
        fn parse_one(blob: &str) -> Result<Vec<f64>, Box<dyn Error>> {
            let normalized = if blob.contains(',') {
                blob.to_string()
            } else if blob.contains(' ') {
                blob.replace(' ', ",")
            } else {
                blob.replace('\n', ",")
            };

            let mut values = Vec::new();
            for token in normalized.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                values.push(token.parse::<f64>()?);
            }
            Ok(values)
        }

        Ok((parse_one(blob1)?, parse_one(blob2)?))
    }
}

/// Functions for exporting text objects.
pub struct Export;

impl Export {
    /// Concatenates text files into one output file, in the order given.
    pub fn concat_text_files(
        input_files: &[&str],
        output_file: &str,
    ) -> Result<(), Box<dyn Error>> {
        let mut outfile = File::create(output_file)?;
        for fname in input_files {
            let mut contents = String::new();
            File::open(fname)?.read_to_string(&mut contents)?;
            outfile.write_all(contents.as_bytes())?;
        }
        Ok(())
    }

    /// Replaces all occurrences of `find` with `replace` in every file under
    /// `directory` (recursively) whose name ends with `file_suffix`.
    pub fn find_replace_text(
        directory: &str,
        find: &str,
        replace: &str,
        file_suffix: &str,
    ) -> Result<(), Box<dyn Error>> {
        fn walk(
            dir: &Path,
            find: &str,
            replace: &str,
            file_suffix: &str,
        ) -> Result<(), Box<dyn Error>> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, find, replace, file_suffix)?;
                } else if path
                    .file_name()
                    .map(|n| n.to_string_lossy().ends_with(file_suffix))
                    .unwrap_or(false)
                {
                    let contents = fs::read_to_string(&path)?;
                    fs::write(&path, contents.replace(find, replace))?;
                }
            }
            Ok(())
        }

        walk(Path::new(directory), find, replace, file_suffix)
    }

    /// Dumps a JSON value to `{dir}.json`.
    pub fn dump_json(obj: &Value, dir: &str) -> Result<(), Box<dyn Error>> {
        let mut outfile = File::create(format!("{}.json", dir))?;
        outfile.write_all(serde_json::to_string(obj)?.as_bytes())?;
        Ok(())
    }

    /// Dumps SQL text to `{dir}.sql`.
    pub fn dump_sql(obj: &str, dir: &str) -> Result<(), Box<dyn Error>> {
        let mut outfile = File::create(format!("{}.sql", dir))?;
        outfile.write_all(obj.as_bytes())?;
        Ok(())
    }
}
