use crate::errors::Result;
use crate::preview::MatchRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Characters of a line shown before it is cut off in text output.
pub const LINE_DISPLAY_LIMIT: usize = 100;

/// Defines the possible output formats for preview records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A tree-like, human-readable text format.
    Text,
    /// JSON format, suitable for machine processing.
    Json,
    /// Comma-Separated Values format.
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Text,
        }
    }
}

/// Handles the formatting of preview records into various output formats.
pub struct OutputFormatter {
    format: OutputFormat,
    include_summary: bool,
    tool_name: String,
    tool_version: String,
}

impl OutputFormatter {
    /// Creates a new `OutputFormatter`.
    ///
    /// `include_summary` only affects the `Text` format.
    pub fn new(format: OutputFormat, include_summary: bool) -> Self {
        Self {
            format,
            include_summary,
            tool_name: "replitex".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Writes the formatted records to a given writer.
    pub fn write_output<W: Write>(&self, writer: &mut W, records: &[MatchRecord]) -> Result<()> {
        let output = match self.format {
            OutputFormat::Text => self.format_text(records),
            OutputFormat::Json => self.format_json(records)?,
            OutputFormat::Csv => self.format_csv(records)?,
        };

        writer.write_all(output.as_bytes())?;

        if self.include_summary && self.format == OutputFormat::Text {
            writer.write_all(self.format_summary(records).as_bytes())?;
        }

        Ok(())
    }

    fn format_text(&self, records: &[MatchRecord]) -> String {
        let mut output = String::new();
        if records.is_empty() {
            output.push_str("No changes.\n");
            return output;
        }

        for record in records {
            match record {
                MatchRecord::NameChange {
                    path,
                    old_name,
                    new_name,
                    ..
                } => {
                    output.push_str(&format!("[rename] {}\n", path.display()));
                    output.push_str(&format!("    {old_name} -> {new_name}\n"));
                }
                MatchRecord::ContentChange { path, .. } => {
                    output.push_str(&format!("[content] {}\n", path.display()));
                }
                MatchRecord::CreatedCopy { source, path, .. } => {
                    output.push_str(&format!("[copy] {}\n", path.display()));
                    output.push_str(&format!("    from {}\n", source.display()));
                }
                MatchRecord::CreatedRenamedCopy { source, path, .. } => {
                    output.push_str(&format!("[renamed copy] {}\n", path.display()));
                    output.push_str(&format!("    from {}\n", source.display()));
                }
                MatchRecord::CreatedCopyForContent { source, path, .. } => {
                    output.push_str(&format!("[content copy] {}\n", path.display()));
                    output.push_str(&format!("    from {}\n", source.display()));
                }
            }

            if let Some(diff) = record.diff() {
                output.push_str(&format!(
                    "    {} replacements in {} lines\n",
                    diff.replacements, diff.matched_lines
                ));
                for line in &diff.lines {
                    output.push_str(&format!(
                        "    {:>5} - {}\n",
                        line.line_number,
                        truncate(&line.original, LINE_DISPLAY_LIMIT)
                    ));
                    output.push_str(&format!(
                        "    {:>5} + {}\n",
                        "",
                        truncate(&line.replaced, LINE_DISPLAY_LIMIT)
                    ));
                }
                let hidden = diff.matched_lines.saturating_sub(diff.lines.len());
                if hidden > 0 {
                    output.push_str(&format!("    ... and {hidden} more lines\n"));
                }
            }
        }

        output
    }

    fn format_summary(&self, records: &[MatchRecord]) -> String {
        let count = |kind: &str| records.iter().filter(|r| r.kind() == kind).count();
        format!(
            "\n{} planned changes: {} renames, {} content rewrites, {} copies, {} renamed copies, {} content copies\n",
            records.len(),
            count("name_change"),
            count("content_change"),
            count("created_copy"),
            count("created_renamed_copy"),
            count("created_copy_for_content"),
        )
    }

    fn format_json(&self, records: &[MatchRecord]) -> Result<String> {
        #[derive(Serialize)]
        struct JsonOutput<'a> {
            tool: ToolInfo<'a>,
            preview_time: DateTime<Utc>,
            total_changes: usize,
            changes: &'a [MatchRecord],
        }

        #[derive(Serialize)]
        struct ToolInfo<'a> {
            name: &'a str,
            version: &'a str,
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: &self.tool_name,
                version: &self.tool_version,
            },
            preview_time: Utc::now(),
            total_changes: records.len(),
            changes: records,
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    /// One row per record, or one row per changed line for content records.
    fn format_csv(&self, records: &[MatchRecord]) -> Result<String> {
        use csv::Writer;

        let mut wtr = Writer::from_writer(vec![]);

        wtr.write_record([
            "Type",
            "Path",
            "Source",
            "Old name",
            "New name",
            "Replacements",
            "Line",
            "Original",
            "Replaced",
        ])?;

        for record in records {
            let path = display(record.path());
            let (source, old_name, new_name) = match record {
                MatchRecord::NameChange {
                    old_name, new_name, ..
                } => (String::new(), old_name.as_str(), new_name.as_str()),
                MatchRecord::CreatedRenamedCopy {
                    source,
                    old_name,
                    new_name,
                    ..
                } => (display(source), old_name.as_str(), new_name.as_str()),
                MatchRecord::CreatedCopy { source, .. }
                | MatchRecord::CreatedCopyForContent { source, .. } => (display(source), "", ""),
                MatchRecord::ContentChange { .. } => (String::new(), "", ""),
            };

            match record.diff() {
                Some(diff) if !diff.lines.is_empty() => {
                    let replacements = diff.replacements.to_string();
                    for line in &diff.lines {
                        wtr.write_record([
                            record.kind(),
                            path.as_str(),
                            source.as_str(),
                            old_name,
                            new_name,
                            replacements.as_str(),
                            line.line_number.to_string().as_str(),
                            line.original.as_str(),
                            line.replaced.as_str(),
                        ])?;
                    }
                }
                diff => {
                    let replacements = diff.map(|d| d.replacements.to_string()).unwrap_or_default();
                    wtr.write_record([
                        record.kind(),
                        path.as_str(),
                        source.as_str(),
                        old_name,
                        new_name,
                        replacements.as_str(),
                        "",
                        "",
                        "",
                    ])?;
                }
            }
        }

        let data = wtr.into_inner().map_err(|e| format!("CSV writer error: {}", e))?;
        Ok(String::from_utf8(data).unwrap_or_default())
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Cuts `line` to `limit` characters, marking the cut with `...`.
pub fn truncate(line: &str, limit: usize) -> String {
    match line.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use crate::preview::ContentDiff;
    use std::path::PathBuf;

    fn create_test_records() -> Vec<MatchRecord> {
        let matcher = Matcher::new("foo", "bar", false, false).unwrap();
        vec![
            MatchRecord::ContentChange {
                path: PathBuf::from("/w/a.txt"),
                diff: ContentDiff::compute("let foo = 1;\nplain\nfoo, \"foo\"", &matcher),
            },
            MatchRecord::NameChange {
                path: PathBuf::from("/w/foo.txt"),
                old_name: "foo.txt".to_string(),
                new_name: "bar.txt".to_string(),
                is_file: true,
            },
        ]
    }

    fn render(format: OutputFormat, summary: bool) -> String {
        let mut out = Vec::new();
        OutputFormatter::new(format, summary)
            .write_output(&mut out, &create_test_records())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_format() {
        let text = render(OutputFormat::Text, true);
        assert!(text.contains("[content] /w/a.txt"));
        assert!(text.contains("3 replacements in 2 lines"));
        assert!(text.contains("- let foo = 1;"));
        assert!(text.contains("+ let bar = 1;"));
        assert!(text.contains("foo.txt -> bar.txt"));
        assert!(text.contains("2 planned changes: 1 renames, 1 content rewrites"));
    }

    #[test]
    fn test_json_format() {
        let json: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json, false)).unwrap();
        assert_eq!(json["tool"]["name"], "replitex");
        assert_eq!(json["total_changes"], 2);
        assert_eq!(json["changes"][0]["type"], "content_change");
        assert_eq!(json["changes"][1]["new_name"], "bar.txt");
    }

    #[test]
    fn test_csv_format() {
        let csv = render(OutputFormat::Csv, false);
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("Type,Path,Source"));
        // Two changed lines plus one rename.
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("\"foo, \"\"foo\"\"\""));
        assert!(lines[3].starts_with("name_change,/w/foo.txt,,foo.txt,bar.txt"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        let long = "й".repeat(120);
        let cut = truncate(&long, LINE_DISPLAY_LIMIT);
        assert_eq!(cut.chars().count(), LINE_DISPLAY_LIMIT + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from("whatever"), OutputFormat::Text);
    }
}
