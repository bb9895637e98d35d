//! JSON line I/O for the CLI
//!
//! - Input: one JSON request per line on the reader
//! - Output: one JSON response per line on the writer
//! - Blank lines are skipped

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Non-blank lines of the reader
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader
        .lines()
        .map(|line| line.map_err(CliError::from))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}

/// Write one JSON value as a line and flush
pub fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a success envelope
pub fn write_response<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    write_line(writer, &serde_json::json!({"status": "ok", "data": data}))
}

/// Write an error envelope
pub fn write_error<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        writer,
        &serde_json::json!({"status": "error", "code": code, "message": message}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_lines_skips_blank() {
        let input = Cursor::new("{\"a\":1}\n\n   \n{\"b\":2}\n");
        let lines: Vec<String> = read_lines(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_write_envelopes() {
        let mut out = Vec::new();
        write_response(&mut out, serde_json::json!(1)).unwrap();
        write_error(&mut out, "CODE", "msg").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"status":"ok","data":1}"#);
        assert_eq!(lines[1], r#"{"status":"error","code":"CODE","message":"msg"}"#);
    }
}
