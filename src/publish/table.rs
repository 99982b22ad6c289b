use crate::dataset::log::MetadataLog;
use crate::error::{DatasetError, Result};
use crate::models::CaptionRow;
use std::path::Path;

/// Captions keyed by image file name, in file order.
///
/// Lookups are a linear scan; the first matching row wins.
#[derive(Debug, Default, Clone)]
pub struct CaptionTable {
    rows: Vec<CaptionRow>,
}

impl CaptionTable {
    pub fn from_rows(rows: Vec<CaptionRow>) -> Self {
        Self { rows }
    }

    /// Load a comma-delimited table, or a newline-delimited JSON metadata log
    /// when the path ends in `.json`/`.jsonl`.
    pub fn load(path: &Path) -> Result<Self> {
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("json" | "jsonl") => Self::from_metadata_log(&MetadataLog::open(path)?),
            _ => Self::from_csv(path, &std::fs::read_to_string(path)?)?,
        };
        tracing::info!("Loaded {} caption rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn from_metadata_log(log: &MetadataLog) -> Self {
        Self::from_rows(
            log.records()
                .iter()
                .map(|r| CaptionRow {
                    file_name: r.file_name.clone(),
                    text: r.text.clone(),
                })
                .collect(),
        )
    }

    /// Parse CSV text with a header row that names `file_name` and `text`.
    /// Fields may be quoted; whitespace right after a delimiter is ignored.
    pub fn from_csv(path: &Path, contents: &str) -> Result<Self> {
        let cleaned = skip_initial_space(contents);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(cleaned.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DatasetError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name,
                })
        };
        let file_col = column("file_name")?;
        let text_col = column("text")?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(CaptionRow {
                file_name: record.get(file_col).unwrap_or_default().to_string(),
                text: record.get(text_col).unwrap_or_default().to_string(),
            });
        }
        Ok(Self::from_rows(rows))
    }

    pub fn caption_for(&self, file_name: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.file_name == file_name)
            .map(|row| row.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Drop spaces and tabs that directly follow an unquoted comma, so that
/// `a, "b"` parses the second field as quoted.
fn skip_initial_space(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut in_quotes = false;
    let mut after_delimiter = false;

    for ch in contents.chars() {
        if after_delimiter && (ch == ' ' || ch == '\t') {
            continue;
        }
        after_delimiter = false;
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => after_delimiter = true,
            _ => {}
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataRecord;

    fn parse(contents: &str) -> CaptionTable {
        CaptionTable::from_csv(Path::new("metadata.csv"), contents).expect("parse csv")
    }

    #[test]
    fn quoted_fields_with_leading_space() {
        let table = parse(
            "\"file_name\", \"text\"\n\
             \"design_1.jpeg\", \"Block print, indigo\"\n\
             design_2.jpeg,   plain caption\n",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.caption_for("design_1.jpeg"), Some("Block print, indigo"));
        assert_eq!(table.caption_for("design_2.jpeg"), Some("plain caption"));
    }

    #[test]
    fn first_match_wins_and_misses_are_none() {
        let table = parse("file_name,text\na.jpeg,first\na.jpeg,second\n");
        assert_eq!(table.caption_for("a.jpeg"), Some("first"));
        assert_eq!(table.caption_for("b.jpeg"), None);
    }

    #[test]
    fn extra_columns_in_any_order() {
        let table = parse("text,width,file_name\nhello,512,x.jpeg\n");
        assert_eq!(table.caption_for("x.jpeg"), Some("hello"));
    }

    #[test]
    fn embedded_quotes_keep_their_spaces() {
        assert_eq!(skip_initial_space("a, \"b, c\"\n"), "a,\"b, c\"\n");
        assert_eq!(skip_initial_space("a,\t\"x\"\"y\", z"), "a,\"x\"\"y\",z");
    }

    #[test]
    fn missing_text_column_is_an_error() {
        let err = CaptionTable::from_csv(Path::new("m.csv"), "file_name,caption\na,b\n")
            .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { column: "text", .. }));
    }

    #[test]
    fn jsonl_path_reads_the_metadata_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("metadata.jsonl");
        let record = MetadataRecord::new("design_1.jpeg", "X", "a.jpg");
        let line = serde_json::to_string(&record).unwrap();
        std::fs::write(&path, format!("{}\n", line)).unwrap();

        let table = CaptionTable::load(&path).expect("load");
        assert_eq!(table.caption_for("design_1.jpeg"), Some("X"));
    }

    #[test]
    fn missing_table_is_an_error_for_either_format() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["metadata.csv", "metadata.jsonl", "metadata.json"] {
            let err = CaptionTable::load(&temp.path().join(name)).unwrap_err();
            assert!(matches!(err, DatasetError::Io(_)), "{name}");
        }
    }
}
