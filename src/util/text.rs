use std::{borrow::Cow, mem};

use anyhow::{anyhow, Result};

const CSV_SPECIAL_CHARS: &[char] = &[',', '"', '\n', '\r'];

/// Quotes a CSV field when it contains a separator, a quote or a line break.
///
/// Embedded quotes are doubled, e.g. `Shell "Express", Mitte` becomes
/// `"Shell ""Express"", Mitte"`.
pub fn csv_escape(field: &str) -> Cow<'_, str> {
    if !field.contains(CSV_SPECIAL_CHARS) {
        return Cow::Borrowed(field);
    }

    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    quoted.push_str(&field.replace('"', "\"\""));
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Joins fields into one CSV line terminated by `\n`.
pub fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::with_capacity(256);
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&csv_escape(field.as_ref()));
    }
    line.push('\n');
    line
}

/// Splits CSV text into records.
///
/// Handles quoted fields with embedded separators, doubled quotes and line
/// breaks. Blank lines are skipped, `\r\n` is accepted as a line ending. An
/// unterminated quoted field is an error.
pub fn csv_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_started_at = 0;
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_started_at = line;
            }
            ',' => record.push(mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                if record.is_empty() && field.is_empty() {
                    continue;
                }
                record.push(mem::take(&mut field));
                records.push(mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(anyhow!(
            "unterminated quoted field starting at line {}",
            quote_started_at
        ));
    }

    if !record.is_empty() || !field.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("ARAL"), "ARAL");
        assert_eq!(csv_escape("Kaiserstr. 5, Hof"), "\"Kaiserstr. 5, Hof\"");
        assert_eq!(csv_escape("Shell \"Express\""), "\"Shell \"\"Express\"\"\"");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn test_csv_line() {
        assert_eq!(csv_line(["a", "", "b,c"]), "a,,\"b,c\"\n");
    }

    #[test]
    fn test_csv_records() {
        let text = "id,name,diesel\r\n1,\"Esso, Nord\",1.659\n\n2,\"Total \"\"24h\"\"\",\n3,\"two\nlines\",1.7";
        let records = csv_records(text).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0], vec!["id", "name", "diesel"]);
        assert_eq!(records[1], vec!["1", "Esso, Nord", "1.659"]);
        assert_eq!(records[2], vec!["2", "Total \"24h\"", ""]);
        assert_eq!(records[3], vec!["3", "two\nlines", "1.7"]);
    }

    #[test]
    fn test_csv_records_round_trip() {
        let fields = ["x", "a,b", "say \"hi\"", "", "multi\nline"];
        let records = csv_records(&csv_line(fields)).unwrap();

        assert_eq!(records, vec![fields.iter().map(|f| f.to_string()).collect::<Vec<_>>()]);
    }

    #[test]
    fn test_csv_records_unterminated() {
        assert!(csv_records("id,name\n1,\"broken\n").is_err());
        assert!(csv_records("").unwrap().is_empty());
    }
}
