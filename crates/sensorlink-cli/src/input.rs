use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::ValueEnum;
use glob::glob;

use crate::CliError;

/// Text encoding of payloads given on the command line or in an input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    /// Hex when the text is only hex digits, otherwise base64.
    #[default]
    Auto,
    Hex,
    Base64,
}

/// Decode one payload string.
///
/// Hex input may carry a `0x` prefix and `:` or whitespace separators.
pub fn parse_payload(text: &str, encoding: Encoding) -> Result<Vec<u8>> {
    let text = text.trim();
    match encoding {
        Encoding::Hex => decode_hex(text),
        Encoding::Base64 => decode_base64(text),
        Encoding::Auto => {
            let cleaned = clean_hex(text);
            if !cleaned.is_empty()
                && cleaned.len() % 2 == 0
                && cleaned.chars().all(|c| c.is_ascii_hexdigit())
            {
                decode_hex(text)
            } else {
                decode_base64(text)
            }
        }
    }
}

fn clean_hex(text: &str) -> String {
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect()
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(clean_hex(text)).with_context(|| format!("invalid hex payload '{text}'"))
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .with_context(|| format!("invalid base64 payload '{text}'"))
}

/// Payload lines from an input file, skipping blank lines and `#` comments.
pub fn read_payload_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Resolve a path or glob pattern to exactly one existing file.
pub fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        if !input.is_file() {
            return Err(CliError::new(
                format!("input file not found: {}", input.display()),
                Some("pass a text file with one payload per line".to_string()),
            ));
        }
        return Ok(input.to_path_buf());
    }

    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let more = if count > 3 { ", ..." } else { "" };
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}' ({} matches); matches: {}{}",
                    pattern, count, listed, more
                ),
                Some("pass a single input file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

/// Parse every payload, naming the offending source on failure.
pub fn parse_all(
    sources: &[(String, String)],
    encoding: Encoding,
) -> Result<Vec<Vec<u8>>, CliError> {
    sources
        .iter()
        .map(|(origin, text)| {
            parse_payload(text, encoding).map_err(|err| {
                CliError::new(
                    format!("{origin}: {err:#}"),
                    Some("use --encoding hex or --encoding base64 to force a format".to_string()),
                )
            })
        })
        .collect()
}
