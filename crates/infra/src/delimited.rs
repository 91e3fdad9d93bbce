//! Comma-delimited record codec for staged import/export files.
//!
//! The first non-blank row is the header. Fields may be wrapped in double
//! quotes; inside quotes, `""` is a literal quote and commas/newlines are data.
//! A quote opens a quoted field only at the start of a field (leading blanks
//! allowed); elsewhere it is an ordinary character. After the closing quote
//! only blanks may precede the next comma or line break. Blank lines are ignored. Rows shorter than the header simply lack the
//! trailing columns; extra fields are dropped.

use std::collections::BTreeMap;

use thiserror::Error;

/// One data row keyed by (trimmed) header name.
pub type Record = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DelimitedError {
    #[error("staged file is not valid UTF-8")]
    Encoding,

    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("unexpected text after closing quote on line {line}")]
    TextAfterQuote { line: usize },

    #[error("staged file has no header row")]
    MissingHeader,
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<Record>, DelimitedError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DelimitedError::Encoding)?;
    parse(text)
}

pub fn parse(text: &str) -> Result<Vec<Record>, DelimitedError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = split_rows(text)?.into_iter();

    let headers: Vec<String> = rows
        .next()
        .ok_or(DelimitedError::MissingHeader)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    Ok(rows
        .map(|fields| {
            headers
                .iter()
                .cloned()
                .zip(fields)
                .collect::<Record>()
        })
        .collect())
}

/// Render `rows` under `headers`, quoting fields where needed.
pub fn write<I>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = String::new();
    push_row(&mut out, headers.iter().copied());
    for row in rows {
        push_row(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn push_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(field) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

fn needs_quotes(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r']) || field.trim() != field
}

fn split_rows(text: &str) -> Result<Vec<Vec<String>>, DelimitedError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut quote_line = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            ',' => {
                after_quote = false;
                row.push(std::mem::take(&mut field));
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                after_quote = false;
                line += 1;
                finish_row(&mut rows, &mut row, &mut field);
            }
            ' ' | '\t' if after_quote => {}
            _ if after_quote => return Err(DelimitedError::TextAfterQuote { line }),
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                quote_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DelimitedError::UnterminatedQuote { line: quote_line });
    }
    finish_row(&mut rows, &mut row, &mut field);

    Ok(rows)
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field));
    let fields = std::mem::take(row);
    let blank = fields.iter().all(|f| f.trim().is_empty());
    if !blank {
        rows.push(fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let records = parse("product_id, product_name ,quantity,price\np1,Widget,20,9.99\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["product_id"], "p1");
        assert_eq!(records[0]["product_name"], "Widget");
        assert_eq!(records[0]["price"], "9.99");
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let text = "id,name\r\np1,\"Bolt, \"\"hex\"\"\"\r\np2,\"two\nlines\"\r\n";
        let records = parse(text).unwrap();
        assert_eq!(records[0]["name"], "Bolt, \"hex\"");
        assert_eq!(records[1]["name"], "two\nlines");
    }

    #[test]
    fn blank_lines_are_skipped_and_short_rows_lack_columns() {
        let records = parse("a,b,c\n\n1,2\n  \n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("b").map(String::as_str), Some("2"));
        assert!(!records[0].contains_key("c"));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse("a,b\n1,\"oops\n").unwrap_err();
        assert_eq!(err, DelimitedError::UnterminatedQuote { line: 2 });
    }

    #[test]
    fn text_after_a_closing_quote_is_rejected() {
        let err = parse("id,name\np1,\"a\"b\n").unwrap_err();
        assert_eq!(err, DelimitedError::TextAfterQuote { line: 2 });

        let records = parse("id,name\np1, \"a\" \np2,5\" bolt\n").unwrap();
        assert_eq!(records[0]["name"], "a");
        assert_eq!(records[1]["name"], "5\" bolt");
    }

    #[test]
    fn empty_input_has_no_header() {
        assert_eq!(parse("\n\n").unwrap_err(), DelimitedError::MissingHeader);
    }

    #[test]
    fn written_output_parses_back() {
        let text = write(
            &["id", "name"],
            vec![vec!["p1".to_string(), "Bolt, \"hex\"".to_string()]],
        );
        assert_eq!(text, "id,name\np1,\"Bolt, \"\"hex\"\"\"\n");
        assert_eq!(parse(&text).unwrap()[0]["name"], "Bolt, \"hex\"");
    }
}
