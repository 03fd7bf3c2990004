use crate::record::{ItemKind, ParsedItem};
use itertools::Itertools;
use std::fmt;

/// One physical line: the parsed content plus the comment that was
/// hanging off it. `comment_start` remembers the column the comment
/// began at so edits to the content do not shift it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLine {
    pub item: ParsedItem,
    pub comment: Option<String>,
    pub comment_start: Option<usize>,
}

impl ConfigLine {
    pub fn new(item: ParsedItem, comment: Option<String>, comment_start: Option<usize>) -> ConfigLine {
        ConfigLine {
            item,
            comment,
            comment_start,
        }
    }
}

impl fmt::Display for ConfigLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.item.to_string();
        let content = rendered.trim_end();
        let comment = match &self.comment {
            None => return write!(f, "{}", content),
            Some(comment) => comment,
        };
        let column = self.comment_start.unwrap_or(0);
        let width = content.chars().count();
        if width < column {
            write!(f, "{:<column$}{}", content, comment, column = column)
        } else if width == 0 {
            write!(f, "{}", comment)
        } else {
            // content grew past the remembered column, keep one space
            write!(f, "{} {}", content, comment)
        }
    }
}

/// The whole file in parse order. Order is significant: it defines
/// which entry an omitted host inherits from and where the SOA chain
/// members sit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub lines: Vec<ConfigLine>,
}

impl ConfigFile {
    pub fn new() -> ConfigFile {
        ConfigFile { lines: vec![] }
    }

    pub fn add_line(&mut self, line: ConfigLine) {
        self.lines.push(line);
    }

    /// Remove by index, no-op when out of range.
    pub fn remove(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    /// Last item that is not an empty line.
    pub fn last_item(&self) -> Option<&ParsedItem> {
        self.lines
            .iter()
            .rev()
            .map(|line| &line.item)
            .find(|item| item.kind() != ItemKind::Empty)
    }

    pub fn is_last_item_of_kind(&self, kind: ItemKind) -> bool {
        matches!(self.last_item(), Some(item) if item.kind() == kind)
    }

    pub fn items_of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &ParsedItem> {
        self.lines
            .iter()
            .map(|line| &line.item)
            .filter(move |item| item.kind() == kind)
    }

    pub fn first_item_mut(&mut self, kind: ItemKind) -> Option<&mut ParsedItem> {
        self.lines
            .iter_mut()
            .map(|line| &mut line.item)
            .find(|item| item.kind() == kind)
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.lines.iter().map(|line| line.to_string()).join("\n")
        )
    }
}
