// Ordered section/key document model and the line-oriented on-disk codec.
//
// The format is the bracketed-section style: `[Name]` headers, `key = value`
// lines, `#`/`;` comments. Comments are not preserved across rewrites; the
// round-trip guarantee covers sections, keys, and values only, including ones
// this crate knows nothing about (forward compatibility for default merges).

use camino::Utf8Path;
use indexmap::IndexMap;

use crate::error::{ConfigError, ConfigResult};

/// An ordered collection of named sections, each an ordered key/value map.
///
/// Section names are case-sensitive and unique; keys are unique within a
/// section. Values are the raw on-disk strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the on-disk text format. `path` is used for error reporting only.
    ///
    /// Rules:
    /// - `[Name]` lines open a section; surrounding whitespace is tolerated.
    /// - `key = value` lines split on the first `=`, both sides trimmed; the
    ///   value may be empty or contain further `=`.
    /// - Lines whose first non-blank character is `#` or `;` are comments;
    ///   blank lines are skipped.
    /// - A key line before any section header, a malformed line, a duplicate
    ///   section, or a duplicate key is an error carrying the 1-based line.
    pub fn parse(text: &str, path: &Utf8Path) -> ConfigResult<Self> {
        let mut sections: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        let mut current: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
                    return Err(parse_err(path, line_no, "unterminated section header"));
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(parse_err(path, line_no, "empty section name"));
                }
                if sections.contains_key(name) {
                    return Err(parse_err(
                        path,
                        line_no,
                        format!("duplicate section [{name}]"),
                    ));
                }
                sections.insert(name.to_string(), IndexMap::new());
                current = Some(name.to_string());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_err(path, line_no, "expected `key = value`"));
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(parse_err(path, line_no, "empty key"));
            }
            let Some(section) = current.as_deref() else {
                return Err(parse_err(path, line_no, "key before any section header"));
            };
            let keys = sections
                .get_mut(section)
                .expect("current section always present");
            if keys.contains_key(key) {
                return Err(parse_err(
                    path,
                    line_no,
                    format!("duplicate key `{key}` in [{section}]"),
                ));
            }
            keys.insert(key.to_string(), value.to_string());
        }

        Ok(Self { sections })
    }

    /// Render the canonical on-disk text: `[Name]` then `key = value` per
    /// key, one blank line between sections.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, (name, keys)) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in keys {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    /// Replace the named section's entire key map with `keys`, discarding any
    /// pre-existing keys. Creates the section if it does not exist; an
    /// existing section keeps its position in the document. Values are
    /// trimmed to their on-disk form before storing.
    pub fn replace_section(
        &mut self,
        name: &str,
        keys: IndexMap<String, String>,
    ) -> ConfigResult<()> {
        check_section_name(name)?;
        let mut normalized = IndexMap::with_capacity(keys.len());
        for (key, value) in keys {
            check_key(&key)?;
            let value = value.trim();
            check_value(value)?;
            normalized.insert(key, value.to_string());
        }
        if let Some(slot) = self.sections.get_mut(name) {
            *slot = normalized;
        } else {
            self.sections.insert(name.to_string(), normalized);
        }
        Ok(())
    }

    /// Insert or overwrite a single key in an existing section. Other keys in
    /// the section are untouched. The value is trimmed to its on-disk form
    /// before storing.
    pub fn set_key(&mut self, section: &str, key: &str, value: &str) -> ConfigResult<()> {
        check_key(key)?;
        let value = value.trim();
        check_value(value)?;
        let Some(keys) = self.sections.get_mut(section) else {
            return Err(ConfigError::UnknownSection(section.to_string()));
        };
        keys.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Lay `user` over `template`: user values win for shared keys,
    /// template-only keys keep the template value, user-only keys and
    /// sections are preserved and appended after the template's.
    pub fn layered(template: &Self, user: &Self) -> Self {
        let mut merged = template.clone();
        for (name, keys) in &user.sections {
            let slot = merged.sections.entry(name.clone()).or_default();
            for (key, value) in keys {
                slot.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(name)
    }

    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Iterate sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.sections.iter().map(|(n, k)| (n.as_str(), k))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn parse_err(path: &Utf8Path, line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

// Write-side guards: reject names/keys/values that would not survive a
// round-trip through the line-oriented format.

fn check_section_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(syntax_err("section name", name, "must not be empty"));
    }
    if name != name.trim() {
        return Err(syntax_err(
            "section name",
            name,
            "must not have leading or trailing whitespace",
        ));
    }
    if name.contains(['[', ']', '\n']) {
        return Err(syntax_err(
            "section name",
            name,
            "must not contain brackets or newlines",
        ));
    }
    Ok(())
}

fn check_key(key: &str) -> ConfigResult<()> {
    if key.is_empty() {
        return Err(syntax_err("key", key, "must not be empty"));
    }
    if key != key.trim() {
        return Err(syntax_err(
            "key",
            key,
            "must not have leading or trailing whitespace",
        ));
    }
    if key.starts_with(['#', ';']) {
        return Err(syntax_err(
            "key",
            key,
            "must not start with a comment character",
        ));
    }
    if key.contains(['=', '[', '\n']) {
        return Err(syntax_err(
            "key",
            key,
            "must not contain `=`, `[`, or newlines",
        ));
    }
    Ok(())
}

fn check_value(value: &str) -> ConfigResult<()> {
    if value.contains('\n') {
        return Err(syntax_err("value", value, "must not contain newlines"));
    }
    Ok(())
}

fn syntax_err(what: &'static str, text: &str, reason: &'static str) -> ConfigError {
    ConfigError::Syntax {
        what,
        text: text.to_string(),
        reason,
    }
}
