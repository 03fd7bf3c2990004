use crate::document::{ConfigFile, ConfigLine};
use crate::errors::ParseZoneErr;
use crate::record::ParsedItem;

/// Split one physical line into its actual content and the trailing
/// comment. A `;` opens a comment unless a backslash escapes it (TXT
/// values carry literal semicolons that way). The returned column is
/// the character offset the comment started at.
pub fn split_comment(line: &str) -> (&str, Option<&str>, Option<usize>) {
    let mut escaped = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '\\' => escaped = !escaped,
            ';' if !escaped => {
                let column = line[..index].chars().count();
                return (line[..index].trim_end(), Some(&line[index..]), Some(column));
            }
            _ => escaped = false,
        }
    }
    (line.trim_end(), None, None)
}

#[test]
fn test_split_comment() {
    assert_eq!(
        split_comment("$TTL 1h   ; default ttl"),
        ("$TTL 1h", Some("; default ttl"), Some(10))
    );
    assert_eq!(split_comment("plain content"), ("plain content", None, None));
    assert_eq!(split_comment("trailing   "), ("trailing", None, None));
    assert_eq!(split_comment(";END"), ("", Some(";END"), Some(0)));
    assert_eq!(
        split_comment(r#"@ TXT "a\;b" ; real comment"#),
        (r#"@ TXT "a\;b""#, Some("; real comment"), Some(13))
    );
}

#[derive(Debug, Default)]
pub struct FileParser;

impl FileParser {
    pub fn new() -> FileParser {
        FileParser
    }

    /// Convert raw config text into a parsed ConfigFile. Classification
    /// of each line consults the document built so far (SOA chain
    /// position, omitted host donors). All-or-nothing: the first
    /// construction failure aborts the parse.
    pub fn parse_lines(&self, text: &str) -> Result<ConfigFile, ParseZoneErr> {
        let mut file = ConfigFile::new();
        for raw_line in text.split('\n') {
            let raw_line = raw_line.trim_end_matches('\r');
            let (content, comment, comment_start) = split_comment(raw_line);
            let item = ParsedItem::classify(content, &file)?;
            file.add_line(ConfigLine::new(
                item,
                comment.map(str::to_owned),
                comment_start,
            ));
        }
        Ok(file)
    }
}
