//! Drive query language rendering
//!
//! Turns a [`ChildQuery`] into the `q` parameter of `files.list`, e.g.
//!
//! ```text
//! 'PARENT' in parents and mimeType = 'application/vnd.google-apps.folder' and name = 'Docs' and trashed = false
//! ```
//!
//! String literals are single-quoted; backslashes and single quotes inside
//! them are escaped with a backslash.

use drivemirror_core::domain::EntryKind;
use drivemirror_core::ports::ChildQuery;

/// MIME type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Escapes `value` for use inside a single-quoted query literal
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders `query` as a Drive `q` expression
pub fn render(query: &ChildQuery) -> String {
    let mut clauses = vec![format!("'{}' in parents", escape(query.parent.as_str()))];

    match query.kind {
        Some(EntryKind::Folder) => clauses.push(format!("mimeType = '{FOLDER_MIME_TYPE}'")),
        Some(EntryKind::File) => clauses.push(format!("mimeType != '{FOLDER_MIME_TYPE}'")),
        None => {}
    }

    if let Some(name) = &query.name {
        clauses.push(format!("name = '{}'", escape(name)));
    }

    clauses.push("trashed = false".to_string());
    clauses.join(" and ")
}
