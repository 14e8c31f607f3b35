//! Plain-text per-vertex arrays.
//!
//! One or more numbers per line separated by whitespace or commas. Blank
//! lines and everything after `#` are ignored. This covers scalar fields,
//! curvature values and label vertex lists exported from other tools.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SurfaceError};

/// Load a list of floating point values.
pub fn load_values<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    load(path.as_ref())
}

/// Load a list of vertex indices.
pub fn load_indices<P: AsRef<Path>>(path: P) -> Result<Vec<usize>> {
    load(path.as_ref())
}

fn load<T: FromStr>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path)?;
    parse(&text).map_err(|message| SurfaceError::LoadError {
        path: path.to_path_buf(),
        message,
    })
}

fn parse<T: FromStr>(text: &str) -> std::result::Result<Vec<T>, String> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let value = token
                .parse()
                .map_err(|_| format!("line {}: cannot parse {token:?}", lineno + 1))?;
            out.push(value);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        let values: Vec<f64> = parse("# header\n1.5, -2\n\n3e2 4 # trailing\n").unwrap();
        assert_eq!(values, vec![1.5, -2.0, 300.0, 4.0]);
    }

    #[test]
    fn test_parse_indices() {
        let idx: Vec<usize> = parse("0 4 7\n9").unwrap();
        assert_eq!(idx, vec![0, 4, 7, 9]);

        let err = parse::<usize>("1\n-3\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let err = load_values("/nonexistent/values.txt").unwrap_err();
        assert!(matches!(err, SurfaceError::Io(_)));
    }
}
