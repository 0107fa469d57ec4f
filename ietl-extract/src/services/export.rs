//! Row export for user stories and requirements
//!
//! Comma-separated rows with a header. Text cells are always double-quoted with
//! embedded quotes doubled; confidence is written unquoted with three decimals.
//! Both writers have a matching parser.

use crate::models::{ExtractionMethod, PriorityLevel, Requirement, UserStory};
use indexmap::IndexMap;
use thiserror::Error;

const STORY_TRAILER: [&str; 5] = [
    "confidence",
    "extraction_method",
    "source_transcript_id",
    "source_snippet",
    "tags",
];

const TAG_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("unexpected header: {0}")]
    Header(String),

    #[error("row {row}: expected {expected} columns, found {found}")]
    ColumnCount {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: invalid {column} value {value:?}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

fn quote(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

fn write_row<'a, I>(out: &mut String, cells: I)
where
    I: IntoIterator<Item = Cell<'a>>,
{
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match cell {
            Cell::Text(t) => quote(out, t),
            Cell::Raw(r) => out.push_str(&r),
        }
    }
    out.push('\n');
}

enum Cell<'a> {
    Text(&'a str),
    Raw(String),
}

/// Export stories; `output_fields` fixes the column order
pub fn write_stories(stories: &[UserStory], output_fields: &[String]) -> String {
    let mut out = String::new();

    let header = std::iter::once("id")
        .chain(output_fields.iter().map(String::as_str))
        .chain(STORY_TRAILER)
        .map(Cell::Text);
    write_row(&mut out, header);

    for story in stories {
        let tags = story.tags.join(TAG_SEPARATOR);
        let cells = std::iter::once(Cell::Text(&story.id))
            .chain(output_fields.iter().map(|f| {
                Cell::Text(story.fields.get(f).map(String::as_str).unwrap_or(""))
            }))
            .chain([
                Cell::Raw(format!("{:.3}", story.confidence)),
                Cell::Text(story.extraction_method.as_str()),
                Cell::Text(&story.source_transcript_id),
                Cell::Text(&story.source_snippet),
                Cell::Text(&tags),
            ]);
        write_row(&mut out, cells);
    }

    out
}

/// Parse exported stories back; returns the output fields and the stories
pub fn parse_stories(input: &str) -> Result<(Vec<String>, Vec<UserStory>), ExportError> {
    let mut rows = parse_rows(input)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(ExportError::Header("missing header row".to_string()));
    };

    let width = header.len();
    let trailer_ok = width >= STORY_TRAILER.len() + 1
        && header[width - STORY_TRAILER.len()..]
            .iter()
            .map(String::as_str)
            .eq(STORY_TRAILER);
    if !trailer_ok || header[0] != "id" {
        return Err(ExportError::Header(header.join(",")));
    }
    let output_fields: Vec<String> = header[1..width - STORY_TRAILER.len()].to_vec();

    let mut stories = Vec::new();
    for (row, cells) in rows {
        if cells.len() != width {
            return Err(ExportError::ColumnCount {
                row,
                expected: width,
                found: cells.len(),
            });
        }
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();

        let id = next();
        let fields: IndexMap<String, String> =
            output_fields.iter().map(|f| (f.clone(), next())).collect();

        let confidence_text = next();
        let confidence = confidence_text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .ok_or_else(|| ExportError::InvalidValue {
                row,
                column: "confidence",
                value: confidence_text.clone(),
            })?;

        let method_text = next();
        let extraction_method =
            ExtractionMethod::parse(&method_text).ok_or_else(|| ExportError::InvalidValue {
                row,
                column: "extraction_method",
                value: method_text.clone(),
            })?;

        let source_transcript_id = next();
        let source_snippet = next();
        let tags_text = next();
        let tags = if tags_text.is_empty() {
            Vec::new()
        } else {
            tags_text.split(TAG_SEPARATOR).map(str::to_string).collect()
        };

        stories.push(UserStory {
            id,
            fields,
            tags,
            confidence,
            extraction_method,
            source_transcript_id,
            source_snippet,
        });
    }

    Ok((output_fields, stories))
}

/// Union of requirement field names in first-seen order
fn requirement_columns(requirements: &[Requirement]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for r in requirements {
        for key in r.fields.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

pub fn write_requirements(requirements: &[Requirement]) -> String {
    let mut out = String::new();
    let columns = requirement_columns(requirements);

    let header = ["req_id", "requirement", "priority_level"]
        .into_iter()
        .chain(columns.iter().copied())
        .chain(std::iter::once("source_story_id"))
        .map(Cell::Text);
    write_row(&mut out, header);

    for r in requirements {
        let cells = [
            Cell::Text(&r.req_id),
            Cell::Text(&r.requirement),
            Cell::Text(r.priority_level.as_str()),
        ]
        .into_iter()
        .chain(
            columns
                .iter()
                .map(|c| Cell::Text(r.fields.get(*c).map(String::as_str).unwrap_or(""))),
        )
        .chain(std::iter::once(Cell::Text(&r.source_story_id)));
        write_row(&mut out, cells);
    }

    out
}

pub fn parse_requirements(input: &str) -> Result<Vec<Requirement>, ExportError> {
    let mut rows = parse_rows(input)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(ExportError::Header("missing header row".to_string()));
    };

    let width = header.len();
    let header_ok = width >= 4
        && header[..3] == ["req_id", "requirement", "priority_level"]
        && header[width - 1] == "source_story_id";
    if !header_ok {
        return Err(ExportError::Header(header.join(",")));
    }
    let columns = &header[3..width - 1];

    let mut requirements = Vec::new();
    for (row, cells) in rows {
        if cells.len() != width {
            return Err(ExportError::ColumnCount {
                row,
                expected: width,
                found: cells.len(),
            });
        }
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();

        let req_id = next();
        let requirement = next();
        let level_text = next();
        let priority_level =
            PriorityLevel::parse(&level_text).ok_or_else(|| ExportError::InvalidValue {
                row,
                column: "priority_level",
                value: level_text.clone(),
            })?;
        let fields = columns.iter().map(|c| (c.clone(), next())).collect();
        let source_story_id = next();

        requirements.push(Requirement {
            req_id,
            requirement,
            priority_level,
            fields,
            source_story_id,
        });
    }
    Ok(requirements)
}

/// Split input into rows of cells, tagging each row with its starting line
fn parse_rows(input: &str) -> Result<Vec<(usize, Vec<String>)>, ExportError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut line = 1;
    let mut row_line = 1;
    let mut chars = input.chars().peekable();
    let mut in_quotes = false;
    let mut after_quote = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    cell.push(c);
                }
                _ => cell.push(c),
            }
            continue;
        }

        match c {
            ',' => {
                row.push(std::mem::take(&mut cell));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push((row_line, std::mem::take(&mut row)));
                after_quote = false;
                line += 1;
                row_line = line;
            }
            '"' if cell.is_empty() && !after_quote => in_quotes = true,
            _ if after_quote => {
                return Err(ExportError::Malformed {
                    line,
                    message: format!("unexpected {:?} after closing quote", c),
                })
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err(ExportError::Malformed {
            line: row_line,
            message: "unterminated quoted cell".to_string(),
        });
    }
    if !cell.is_empty() || !row.is_empty() || after_quote {
        row.push(cell);
        rows.push((row_line, row));
    }
    Ok(rows)
}
