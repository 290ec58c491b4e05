//! Command-line argument surface.
//!
//! ```text
//! postkid <collection> <request> [name=value ...] [-R | -I] [--header]
//!         [-e NAME] [-p FOLDER] [-q K=V&K=V]
//! ```

use crate::display::DisplayMode;
use clap::Parser;
use std::path::PathBuf;

/// A parsed `-q` query string: ordered key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryString(pub Vec<(String, String)>);

/// Parameters of one invocation.
#[derive(Parser, Debug, Clone)]
#[command(name = "postkid", version, about = "Collection-driven HTTP request runner")]
pub struct Parameters {
    /// Collection file name or path; ".yaml" is appended when the name
    /// does not already contain it
    pub collection: String,

    /// Name of the request to send
    pub request: String,

    /// Ad-hoc variables as name=value pairs, highest-priority layer
    #[arg(value_name = "VAR=VALUE", value_parser = parse_variable)]
    pub variables: Vec<(String, String)>,

    /// Print the response body only
    #[arg(short = 'R', conflicts_with = "info_only")]
    pub body_only: bool,

    /// Print response metadata only (status, URL, headers), no body
    #[arg(short = 'I')]
    pub info_only: bool,

    /// Include headers in the default display mode
    #[arg(long = "header")]
    pub header: bool,

    /// Environment to resolve variables from
    #[arg(short = 'e', value_name = "NAME")]
    pub environment: Option<String>,

    /// Folder prefixed to the collection filename
    #[arg(short = 'p', value_name = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Replace the request query parameters (k=v&k=v)
    #[arg(short = 'q', value_name = "QUERY", value_parser = parse_query)]
    pub query: Option<QueryString>,
}

impl Parameters {
    /// The collection file path after folder join and suffix rule.
    pub fn collection_path(&self) -> PathBuf {
        let file_name = if self.collection.contains(".yaml") {
            self.collection.clone()
        } else {
            format!("{}.yaml", self.collection)
        };

        match &self.folder {
            Some(folder) => folder.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// The display mode selected by `-R`/`-I`/`--header`.
    pub fn display_mode(&self) -> DisplayMode {
        if self.body_only {
            DisplayMode::BodyOnly
        } else if self.info_only {
            DisplayMode::MetadataOnly
        } else {
            DisplayMode::Default {
                headers: self.header,
            }
        }
    }
}

/// Parses one `name=value` pair, splitting at the first `=`.
fn parse_variable(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((name, _)) if name.is_empty() => {
            Err(format!("Variable has no name: '{}'", input))
        }
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!(
            "Expected name=value, got '{}' (missing '=')",
            input
        )),
    }
}

/// Parses a `k=v&k=v` query string into ordered pairs.
fn parse_query(input: &str) -> Result<QueryString, String> {
    let mut pairs = Vec::new();
    for pair in input.split('&') {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                pairs.push((key.to_string(), value.to_string()))
            }
            _ => {
                return Err(format!(
                    "Expected k=v pairs separated by '&', got '{}'",
                    pair
                ))
            }
        }
    }
    Ok(QueryString(pairs))
}
