//! Minimal CSV reader/writer for the reference tables.
//!
//! Comma separated, header row first, double-quoted fields with `""` escapes.
//! A quoted field may span lines. Blank lines outside quotes are skipped and a
//! leading UTF-8 BOM is ignored.

use super::DataLoadError;

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
pub(crate) fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Quote a field if it contains a comma, quote or line break.
pub(crate) fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line (no trailing newline).
pub(crate) fn csv_join<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Group physical lines into records, joining lines while a quoted field is
/// still open. Each record carries the line number it starts on.
fn records(source: &str, text: &str) -> Result<Vec<(usize, String)>, DataLoadError> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let (start, record) = match pending.take() {
            Some((start, mut record)) => {
                record.push('\n');
                record.push_str(line);
                (start, record)
            }
            None if line.trim().is_empty() => continue,
            None => (i + 1, line.to_string()),
        };
        // `""` escapes keep the count even
        if record.matches('"').count() % 2 == 0 {
            out.push((start, record));
        } else {
            pending = Some((start, record));
        }
    }

    if let Some((start, _)) = pending {
        return Err(DataLoadError::Malformed {
            origin: source.to_string(),
            line: start,
            reason: "unterminated quoted field".to_string(),
        });
    }
    Ok(out)
}

/// A parsed CSV document: header plus rectangular rows.
#[derive(Debug, Clone)]
pub(crate) struct CsvTable {
    /// Name of the source, used in error messages
    pub origin: String,
    pub header: Vec<String>,
    /// Data rows; `line` is the 1-based line number in the source
    pub rows: Vec<CsvRow>,
}

#[derive(Debug, Clone)]
pub(crate) struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvTable {
    pub fn parse(source: &str, text: &str) -> Result<Self, DataLoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = records(source, text)?.into_iter();

        let Some((_, header_line)) = records.next() else {
            return Err(DataLoadError::Empty {
                origin: source.to_string(),
            });
        };
        let header: Vec<String> = csv_split(&header_line)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (line, raw) in records {
            let fields = csv_split(&raw);
            if fields.len() != header.len() {
                return Err(DataLoadError::Malformed {
                    origin: source.to_string(),
                    line,
                    reason: format!("expected {} fields, found {}", header.len(), fields.len()),
                });
            }
            rows.push(CsvRow { line, fields });
        }

        Ok(Self {
            origin: source.to_string(),
            header,
            rows,
        })
    }

    /// Index of the first column whose header equals any of `names`.
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.header.iter().position(|h| h == name))
    }

    /// Like `column`, but a missing column is a load error naming `names[0]`.
    pub fn require_column(&self, names: &[&str]) -> Result<usize, DataLoadError> {
        self.column(names).ok_or_else(|| DataLoadError::MissingColumn {
            origin: self.origin.clone(),
            column: names.first().copied().unwrap_or_default().to_string(),
        })
    }

    /// Parse one cell as a finite float.
    pub fn number(&self, row: &CsvRow, col: usize) -> Result<f64, DataLoadError> {
        let raw = row.fields[col].trim();
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(DataLoadError::Malformed {
                origin: self.origin.clone(),
                line: row.line,
                reason: format!("column '{}' is not a finite number: '{}'", self.header[col], raw),
            }),
        }
    }
}
