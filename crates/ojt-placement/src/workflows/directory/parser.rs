use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One raw row of the directory CSV.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectoryRow {
    pub(crate) kind: String,
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) address: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) representative_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) representative_position: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) parent_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) duration: Option<String>,
}

/// Parsed row paired with its 1-based line in the source file.
#[derive(Debug)]
pub(crate) struct NumberedRow {
    pub(crate) line: u64,
    pub(crate) row: DirectoryRow,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<NumberedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row: DirectoryRow = record.deserialize(Some(&headers))?;
        rows.push(NumberedRow { line, row });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
