//! CLI command implementations

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::Value;

use crate::api::ApiHandler;
use crate::collection::Store;
use crate::config::StoreConfig;
use crate::document::Document;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_lines, write_error, write_line, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Exec { config, seed } => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            exec(
                config.as_deref(),
                seed.as_deref(),
                stdin.lock(),
                &mut stdout.lock(),
            )
        }
        Command::Check { config } => check(&config, &mut io::stdout().lock()),
    }
}

/// Build a store, optionally seed it, then answer one response line per
/// request line until the input ends.
///
/// A malformed request produces an error response and the loop continues;
/// only I/O failures end it early.
pub fn exec<R: BufRead, W: Write>(
    config_path: Option<&Path>,
    seed_path: Option<&Path>,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    let config = match config_path {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    let store = Store::with_config(config);

    if let Some(path) = seed_path {
        seed(&store, path)?;
    }

    let handler = ApiHandler::new(&store);
    for line in read_lines(input) {
        match line {
            Ok(request) => write_line(output, &handler.handle(&request).to_value())?,
            Err(e) => {
                write_error(output, e.code_str(), e.message())?;
                break;
            }
        }
    }
    Ok(())
}

/// Validate a configuration file and print it with defaults filled in
pub fn check<W: Write>(config_path: &Path, output: &mut W) -> CliResult<()> {
    let config = StoreConfig::load(config_path)?;
    write_response(output, serde_json::to_value(&config)?)
}

/// Load `{"collection": [documents...], ...}` into the store
fn seed(store: &Store, path: &Path) -> CliResult<()> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::seed_error(format!("Failed to read seed file: {}", e)))?;
    let seed: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::seed_error(format!("Invalid seed JSON: {}", e)))?;

    let collections = seed
        .as_object()
        .ok_or_else(|| CliError::seed_error("seed file must be an object of collections"))?;

    for (name, documents) in collections {
        let documents = documents
            .as_array()
            .ok_or_else(|| CliError::seed_error(format!("seed for '{}' must be an array", name)))?
            .iter()
            .map(|d| Document::from_json(d.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        store.get_collection(name)?.insert_many(documents)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run_exec(seed_json: Option<Value>, input: &str) -> Vec<Value> {
        let temp_dir = TempDir::new().unwrap();
        let seed_path = seed_json.map(|seed| {
            let path = temp_dir.path().join("seed.json");
            fs::write(&path, seed.to_string()).unwrap();
            path
        });

        let mut output = Vec::new();
        exec(None, seed_path.as_deref(), Cursor::new(input.to_string()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_exec_answers_each_line() {
        let responses = run_exec(
            Some(json!({"users": [{"_id": "a", "age": 20}, {"_id": "b", "age": 30}]})),
            concat!(
                r#"{"op":"countDocuments","collection":"users","filter":{"age":{"$gt":25}}}"#,
                "\n\n",
                "not json\n",
                r#"{"op":"findOneAndUpdate","collection":"users","filter":{"_id":"a"},"update":{"$set":{"age":21}},"returnDocument":"after"}"#,
                "\n"
            ),
        );

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], json!({"status": "ok", "data": 1}));
        assert_eq!(responses[1]["code"], "DOCSTORE_API_INVALID_REQUEST");
        assert_eq!(responses[2]["data"], json!({"_id": "a", "age": 21}));
    }

    #[test]
    fn test_seed_must_be_object_of_arrays() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed.json");
        fs::write(&path, r#"{"users": {"_id": "a"}}"#).unwrap();

        let mut output = Vec::new();
        let err = exec(None, Some(&path), Cursor::new(String::new()), &mut output).unwrap_err();
        assert_eq!(err.code_str(), "DOCSTORE_CLI_SEED_ERROR");
    }

    #[test]
    fn test_check_prints_effective_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docstore.json");
        fs::write(&path, r#"{"log_level": "info"}"#).unwrap();

        let mut output = Vec::new();
        check(&path, &mut output).unwrap();
        let response: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(response["data"]["log_level"], "info");
        assert_eq!(response["data"]["max_document_depth"], 100);
    }

    #[test]
    fn test_check_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("docstore.json");
        fs::write(&path, r#"{"max_document_depth": 0}"#).unwrap();

        let err = check(&path, &mut Vec::new()).unwrap_err();
        assert_eq!(err.code_str(), "DOCSTORE_CLI_CONFIG_ERROR");
    }
}
