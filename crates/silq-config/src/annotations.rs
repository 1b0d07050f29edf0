//! Turns `documented` field docs into TOML comments.

use std::any::type_name;

use documented::{Documented, DocumentedFields};
use toml_edit::{Decor, DocumentMut, Item, RawString, Table};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Renders documentation text as TOML comment lines.
pub fn comment_lines(docs: &str) -> String {
    docs.lines()
        .map(|line| {
            if line.trim().is_empty() {
                "#\n".to_string()
            } else {
                format!("# {}\n", line.trim_end())
            }
        })
        .collect()
}

/// Adds `docs` as comments in front of whatever prefix `decor` already carries.
///
/// An existing comment block is kept and separated from the new one by an
/// empty comment line.
pub fn prepend_comment(decor: &mut Decor, docs: &str) {
    let comments = comment_lines(docs);
    let existing = decor
        .prefix()
        .and_then(RawString::as_str)
        .unwrap_or_default()
        .to_string();

    let prefix = if existing.trim().is_empty() {
        format!("{existing}{comments}")
    } else if existing.ends_with('\n') {
        format!("{existing}#\n{comments}")
    } else {
        format!("{existing}\n#\n{comments}")
    };
    decor.set_prefix(prefix);
}

/// Annotates every key of `table` with the field docs of `T`.
///
/// When `with_header` is set the struct-level docs of `T` are attached to the
/// table header as well.
pub fn annotate_table<T>(table: &mut Table, with_header: bool) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    if with_header {
        prepend_comment(table.decor_mut(), T::DOCS);
    }

    for (mut key, item) in table.iter_mut() {
        let name = key.get().to_string();
        let Ok(docs) = T::get_field_docs(&name) else {
            debug!("no documentation for `{}` on {}", name, type_name::<T>());
            continue;
        };

        match item {
            Item::None => return Err(ConfigError::UnexpectedTomlItem(name)),
            Item::Value(_) => prepend_comment(key.leaf_decor_mut(), docs),
            Item::Table(sub) => prepend_comment(sub.decor_mut(), docs),
            Item::ArrayOfTables(array) => {
                if let Some(first) = array.iter_mut().next() {
                    prepend_comment(first.decor_mut(), docs);
                }
            }
        }
    }

    Ok(())
}

/// Annotates the sub-table stored under `key`, if the document has one.
pub fn annotate_section<T>(doc: &mut DocumentMut, key: &str) -> Result<()>
where
    T: Documented + DocumentedFields,
{
    match doc.get_mut(key) {
        Some(Item::Table(table)) => annotate_table::<T>(table, false),
        Some(Item::None) => Err(ConfigError::UnexpectedTomlItem(key.into())),
        _ => Ok(()),
    }
}
