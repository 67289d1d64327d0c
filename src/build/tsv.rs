//! Tab-separated table reading for raw MetaNetX and RetroRules files

use crate::codec;
use crate::error::{CacheError, CacheResult};
use std::collections::HashMap;

/// Where a table declares its column names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// First line of the file (RetroRules exports)
    FirstLine,
    /// Last `#` comment line before the data (MetaNetX exports)
    LastComment,
}

/// A parsed table with named columns
#[derive(Debug)]
pub struct Table<'a> {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<&'a str>>,
}

impl<'a> Table<'a> {
    pub fn parse(text: &'a str, header: Header) -> Self {
        let mut names: Vec<&str> = Vec::new();
        let mut rows = Vec::new();
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        if header == Header::FirstLine {
            if let Some(first) = lines.next() {
                names = split(first);
            }
        }

        for line in lines {
            if line.starts_with('#') {
                if header == Header::LastComment && rows.is_empty() {
                    names = split(line);
                }
                continue;
            }
            rows.push(split(line));
        }

        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| (column_name(name), i))
            .collect();
        Self { columns, rows }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_, 'a>> {
        self.rows.iter().map(move |fields| Row {
            table: self,
            fields,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail unless every named column is present
    pub fn require(&self, file_name: &str, columns: &[&str]) -> CacheResult<()> {
        for column in columns {
            if !self.columns.contains_key(&column_name(column)) {
                return Err(CacheError::Decode {
                    file: file_name.to_string(),
                    reason: format!("missing column '{}'", column),
                });
            }
        }
        Ok(())
    }
}

/// One data row
#[derive(Debug, Clone, Copy)]
pub struct Row<'t, 'a> {
    table: &'t Table<'a>,
    fields: &'t [&'a str],
}

impl<'t, 'a> Row<'t, 'a> {
    /// Field by column name (`#` prefix and case ignored)
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = *self.table.columns.get(&column_name(column))?;
        self.fields.get(index).copied()
    }

    /// Field by column name, `None` when empty or `NA`
    pub fn value(&self, column: &str) -> Option<&'a str> {
        self.get(column).filter(|v| !v.is_empty() && *v != "NA")
    }
}

/// Data lines of a headerless table, split on `delimiter`
pub fn records(text: &str, delimiter: char) -> impl Iterator<Item = Vec<&str>> {
    text.lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .map(move |l| l.split(delimiter).map(str::trim_end).collect())
}

/// Raw file bytes as UTF-8 text, gunzipped when needed
pub fn text(file_name: &str, bytes: &[u8]) -> CacheResult<String> {
    let raw = codec::read_text(file_name, bytes)?;
    String::from_utf8(raw).map_err(|e| CacheError::Decode {
        file: file_name.to_string(),
        reason: e.to_string(),
    })
}

fn split(line: &str) -> Vec<&str> {
    line.split('\t').map(|f| f.trim_end_matches('\r')).collect()
}

fn column_name(raw: &str) -> String {
    raw.trim_start_matches('#').trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_header_strips_hash() {
        let text = "# Rule_ID\tReaction_ID\nRR-1\tMNXR1\nRR-2\tMNXR2\n";
        let table = Table::parse(text, Header::FirstLine);
        let ids: Vec<&str> = table.rows().filter_map(|r| r.get("Rule_ID")).collect();
        assert_eq!(ids, vec!["RR-1", "RR-2"]);
        assert!(table.require("rules.tsv", &["reaction_id"]).is_ok());
        assert!(table.require("rules.tsv", &["Score"]).is_err());
    }

    #[test]
    fn last_comment_is_header() {
        let text = "### MetaNetX\n# licence\n#ID\tname\tformula\nMNXM1\tH+\tH\nMNXM2\tNA\t\n";
        let table = Table::parse(text, Header::LastComment);
        assert_eq!(table.len(), 2);
        let rows: Vec<Row> = table.rows().collect();
        assert_eq!(rows[0].get("id"), Some("MNXM1"));
        assert_eq!(rows[1].value("name"), None);
        assert_eq!(rows[1].value("formula"), None);
    }

    #[test]
    fn records_skip_comments_and_blank_lines() {
        let text = "#source\tID\n\nchebi:1\tMNXM1\ndeprecated:MNXM01\tMNXM1\n";
        let rows: Vec<Vec<&str>> = records(text, '\t').collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["deprecated:MNXM01", "MNXM1"]);
    }
}
