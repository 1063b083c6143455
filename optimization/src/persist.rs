//! Tag-delimited plain-text documents.
//!
//! ```text
//! <TrainingAlgorithm class='GradientDescent'>
//! <BracketingFactor>
//! 1.5
//! </BracketingFactor>
//! </TrainingAlgorithm>
//! ```
//!
//! One flat level of elements under a declaration tag. Element values may span several lines.
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, TrainingError};

#[derive(Debug, Clone, PartialEq)]
pub struct TagDocument {
    name: String,
    class: Option<String>,
    elements: Vec<(String, String)>,
}

impl TagDocument {
    pub fn new(name: &str, class: Option<&str>) -> Self {
        TagDocument {
            name: name.to_string(),
            class: class.map(str::to_string),
            elements: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn elements(&self) -> &[(String, String)] {
        &self.elements
    }

    pub fn push<T: fmt::Display>(&mut self, tag: &str, value: T) {
        self.elements.push((tag.to_string(), value.to_string()));
    }

    pub fn push_flag(&mut self, tag: &str, value: bool) {
        self.push(tag, if value { 1 } else { 0 });
    }

    /// Value of the first element named `tag`.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, value)| value.as_str())
    }

    pub fn value<T: FromStr>(&self, tag: &str) -> Result<Option<T>> {
        match self.get(tag) {
            None => Ok(None),
            Some(text) => text
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| TrainingError::InvalidValue {
                    tag: tag.to_string(),
                    value: text.to_string(),
                }),
        }
    }

    pub fn flag(&self, tag: &str) -> Result<Option<bool>> {
        match self.get(tag).map(str::trim) {
            None => Ok(None),
            Some("1") | Some("true") => Ok(Some(true)),
            Some("0") | Some("false") => Ok(Some(false)),
            Some(other) => Err(TrainingError::InvalidValue {
                tag: tag.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (line, declaration) = lines.next().ok_or_else(|| TrainingError::MalformedFile {
            line: 0,
            reason: "empty document".to_string(),
        })?;
        let (name, class) = parse_declaration(declaration).ok_or_else(|| {
            TrainingError::MalformedFile {
                line,
                reason: format!("expected a declaration tag, found '{}'", declaration),
            }
        })?;
        let mut document = TagDocument {
            name,
            class,
            elements: Vec::new(),
        };

        let mut last_line = line;
        loop {
            let (line, text) = lines.next().ok_or_else(|| TrainingError::MalformedFile {
                line: last_line,
                reason: format!("missing </{}>", document.name),
            })?;
            last_line = line;

            if let Some(closing) = closing_tag(text) {
                if closing == document.name {
                    break;
                }
                return Err(TrainingError::MismatchedTag {
                    expected: document.name.clone(),
                    found: closing.to_string(),
                });
            }

            let (tag, rest) = opening_tag(text).ok_or_else(|| TrainingError::MalformedFile {
                line,
                reason: format!("expected an opening tag, found '{}'", text),
            })?;

            // <Tag>value</Tag> on one line
            if !rest.is_empty() {
                let end = rest.rfind("</").ok_or_else(|| TrainingError::MalformedFile {
                    line,
                    reason: format!("missing </{}>", tag),
                })?;
                let closing = closing_tag(&rest[end..]).unwrap_or("");
                if closing != tag {
                    return Err(TrainingError::MismatchedTag {
                        expected: tag.to_string(),
                        found: closing.to_string(),
                    });
                }
                document.push(tag, rest[..end].trim());
                continue;
            }

            // nested elements are kept verbatim as part of the value
            let mut value = Vec::new();
            let mut open: Vec<String> = Vec::new();
            loop {
                let (line, text) = lines.next().ok_or_else(|| TrainingError::MalformedFile {
                    line: last_line,
                    reason: format!("missing </{}>", tag),
                })?;
                last_line = line;
                if let Some(closing) = closing_tag(text) {
                    let expected = open.last().map_or(tag, String::as_str);
                    if closing != expected {
                        return Err(TrainingError::MismatchedTag {
                            expected: expected.to_string(),
                            found: closing.to_string(),
                        });
                    }
                    if open.pop().is_none() {
                        break;
                    }
                } else if let Some(nested) = nested_opening(text) {
                    open.push(nested.to_string());
                }
                value.push(text);
            }
            document.push(tag, value.join("\n"));
        }
        Ok(document)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for TagDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.class {
            Some(class) => writeln!(f, "<{} class='{}'>", self.name, class)?,
            None => writeln!(f, "<{}>", self.name)?,
        }
        for (tag, value) in self.elements.iter() {
            writeln!(f, "<{}>", tag)?;
            if !value.is_empty() {
                writeln!(f, "{}", value)?;
            }
            writeln!(f, "</{}>", tag)?;
        }
        writeln!(f, "</{}>", self.name)
    }
}

fn parse_declaration(text: &str) -> Option<(String, Option<String>)> {
    if text.starts_with("</") {
        return None;
    }
    let inner = text.strip_prefix('<')?.strip_suffix('>')?.trim();
    let mut parts = inner.splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?;
    let class = parts.next().and_then(|attributes| {
        let start = attributes.find("class=")? + "class=".len();
        let quoted = &attributes[start..];
        let quote = quoted.chars().next().filter(|c| *c == '\'' || *c == '"')?;
        let value = &quoted[1..];
        let end = value.find(quote)?;
        Some(value[..end].to_string())
    });
    Some((name.to_string(), class))
}

fn opening_tag(text: &str) -> Option<(&str, &str)> {
    if text.starts_with("</") {
        return None;
    }
    let inner = text.strip_prefix('<')?;
    let end = inner.find('>')?;
    let tag = &inner[..end];
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return None;
    }
    Some((tag, inner[end + 1..].trim()))
}

/// Name of an element opened on this line and closed on a later one.
fn nested_opening(text: &str) -> Option<String> {
    match opening_tag(text) {
        Some((tag, "")) => Some(tag.to_string()),
        Some(_) => None,
        None => parse_declaration(text).map(|(name, _)| name),
    }
}

fn closing_tag(text: &str) -> Option<&str> {
    text.strip_prefix("</")?.strip_suffix('>').map(str::trim)
}
