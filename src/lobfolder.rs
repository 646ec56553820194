//! LobFolder Resolver: per-column tree of cumulative `lobFolder` paths,
//! indexed by the dotted tree-path of nested fields (spec §3, §4.E).

use std::collections::HashMap;

use crate::xml::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub declared: String,
    pub accumulated: String,
    pub canonical: String,
}

#[derive(Debug, Default)]
pub struct LobFolderInfo {
    entries: HashMap<String, FolderEntry>,
}

impl LobFolderInfo {
    /// Builds the per-column LobFolder tree.
    ///
    /// `archive_lobfolder` is the archive-wide default declared at
    /// `siardArchive/lobFolder`, if any. `column` is the `<column>`
    /// element from the metadata tree; its descendant `<fields><field>`
    /// structure is walked to find nested overrides. `column_name` is the
    /// column's real name, matching the `/<name>` tree-path convention
    /// `content.rs` queries with.
    pub fn init(
        siard_uri: &str,
        column: Element<'_>,
        column_name: &str,
        archive_lobfolder: Option<&str>,
    ) -> Self {
        let mut info = LobFolderInfo::default();

        let declared = archive_lobfolder.unwrap_or_default();
        let root_accumulated = combine("", declared);
        let root_canonical = canonicalize(siard_uri, &root_accumulated);
        info.entries.insert(
            String::new(),
            FolderEntry {
                declared: declared.to_string(),
                accumulated: root_accumulated.clone(),
                canonical: root_canonical,
            },
        );

        let root_path = format!("/{}", column_name);
        info.walk(siard_uri, column, &root_path, &root_accumulated);
        info
    }

    fn walk(&mut self, siard_uri: &str, node: Element<'_>, path: &str, parent_accumulated: &str) {
        let declared = node.child_text("lobFolder").unwrap_or_default();
        let accumulated = combine(parent_accumulated, declared);
        let canonical = canonicalize(siard_uri, &accumulated);

        self.entries.insert(
            path.to_string(),
            FolderEntry {
                declared: declared.to_string(),
                accumulated: accumulated.clone(),
                canonical,
            },
        );

        if let Some(fields) = node.child("fields") {
            for field in fields.children_named("field") {
                let raw_name = field.child_text("name").unwrap_or_default();
                let segment = rename_array_field(raw_name);
                let child_path = format!("{}/{}", path, segment);
                self.walk(siard_uri, field, &child_path, &accumulated);
            }
        }
    }

    /// Direct lookup of the folder resolved for a given tree-path.
    pub fn real_folder_for(&self, tree_path: &str) -> Option<&str> {
        self.entries.get(tree_path).map(|e| e.canonical.as_str())
    }

    pub fn entry(&self, tree_path: &str) -> Option<&FolderEntry> {
        self.entries.get(tree_path)
    }
}

/// Renames an array field's name from `attname[N]` to `aN` (1-based) to
/// match the `<aN>` tags used in content XML.
fn rename_array_field(name: &str) -> String {
    if let Some(open) = name.find('[') {
        if name.ends_with(']') {
            let digits = &name[open + 1..name.len() - 1];
            if let Ok(n) = digits.parse::<u32>() {
                return format!("a{}", n);
            }
        }
    }
    name.to_string()
}

/// The three-rule folder combinator from spec §3.
fn combine(parent: &str, declared: &str) -> String {
    if is_absolute(declared) {
        declared.to_string()
    } else if parent.is_empty() {
        declared.to_string()
    } else if declared.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent, declared)
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Lexically joins `accumulated` against the SIARD URI root and collapses
/// `.`/`..` components without touching the filesystem. An absolute
/// `accumulated` path is returned normalized on its own.
fn canonicalize(siard_uri: &str, accumulated: &str) -> String {
    let joined = if is_absolute(accumulated) {
        accumulated.to_string()
    } else if accumulated.is_empty() {
        siard_uri.to_string()
    } else {
        format!("{}/{}", siard_uri.trim_end_matches('/'), accumulated)
    };

    normalize_lexically(&joined)
}

fn normalize_lexically(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if stack.last().map(|s| *s != "..").unwrap_or(false) {
                    stack.pop();
                } else if !absolute {
                    stack.push("..");
                }
            }
            other => stack.push(other),
        }
    }

    let joined = stack.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;

    #[test]
    fn combine_follows_three_rules() {
        assert_eq!(combine("", "lobs"), "lobs");
        assert_eq!(combine("a", ""), "a");
        assert_eq!(combine("a", "/abs"), "/abs");
        assert_eq!(combine("a", "b"), "a/b");
    }

    #[test]
    fn normalize_collapses_dot_dot() {
        assert_eq!(normalize_lexically("/a/b/../c"), "/a/c");
        assert_eq!(normalize_lexically("a/./b"), "a/b");
    }

    #[test]
    fn array_field_name_is_renamed() {
        assert_eq!(rename_array_field("ys[1]"), "a1");
        assert_eq!(rename_array_field("ys[12]"), "a12");
        assert_eq!(rename_array_field("plain"), "plain");
    }

    #[test]
    fn builds_tree_with_archive_default_and_column_override() {
        let xml = r#"
            <column>
              <name>c1</name>
              <fields>
                <field><name>x</name></field>
                <field><name>ys</name><lobFolder>override</lobFolder></field>
              </fields>
            </column>
        "#;
        let doc = Document::parse(xml).unwrap();
        let info = LobFolderInfo::init("archive.siard", doc.root_element(), "c1", Some("lobs"));

        assert_eq!(info.real_folder_for(""), Some("archive.siard/lobs"));
        assert_eq!(info.real_folder_for("/c1/ys"), Some("archive.siard/lobs/override"));
        assert_eq!(info.real_folder_for("/c1/x"), Some("archive.siard/lobs"));
        assert_eq!(info.real_folder_for("/c1"), Some("archive.siard/lobs"));
    }
}
