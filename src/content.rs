//! Content Emitter: turns one table's per-row content XML into `INSERT
//! INTO` statements, dispatching simple vs. complex column formatters
//! (spec §4.G).

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::affinity::{self, Affinity};
use crate::archive::ArchiveAccessor;
use crate::decode;
use crate::error::ContentError;
use crate::lob;
use crate::lobfolder::LobFolderInfo;
use crate::logger::Logger;
use crate::stats::Stats;
use crate::types::{TypeAttribute, TypeCategory, TypeTable};
use crate::xml::{Document, Element};

/// Nested complex type recursion is bounded to guard against pathological
/// or cyclic type graphs (spec §9).
const MAX_DEPTH: u32 = 64;

/// One resolved table column: its declared type, its LobFolder tree, and
/// whether it was marked complex (array/udt/distinct) by the Metadata
/// Walker's type resolution pass.
pub struct ColumnSpec {
    pub name: String,
    pub attr: TypeAttribute,
    pub lobfolder: LobFolderInfo,
    pub complex: bool,
}

impl ColumnSpec {
    pub fn new(name: String, attr: TypeAttribute, lobfolder: LobFolderInfo) -> Self {
        use crate::types::ExtendedCategory;
        let complex = matches!(
            attr.extended_category(),
            ExtendedCategory::Udt | ExtendedCategory::Distinct
        );
        ColumnSpec {
            name,
            attr,
            lobfolder,
            complex,
        }
    }
}

/// Parses `xml_path` and emits one `INSERT INTO` statement per `<row>` to
/// `sink`. A missing or empty content file yields zero statements, not an
/// error (spec §4.G), but a genuine parse failure is surfaced so the
/// caller can log it and still have emitted the table's `CREATE TABLE`.
#[allow(clippy::too_many_arguments)]
pub fn emit_table(
    table_name: &str,
    columns: &[ColumnSpec],
    types: &TypeTable,
    xml_path: &Path,
    accessor: &mut ArchiveAccessor<'_>,
    logger: &mut Logger,
    stats: &mut Stats,
    sink: &mut dyn Write,
) -> Result<(), ContentError> {
    let source = fs::read_to_string(xml_path)?;
    let doc = Document::parse(&source)?;
    let root = doc.root_element();

    for row in root.children_named("row") {
        let mut parts = Vec::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            let tag = format!("c{}", i + 1);
            let element = row.child(&tag);
            let tree_path = format!("/{}", column.name);

            let rendered = if column.complex {
                let type_schema = column.attr.type_schema.as_deref().unwrap_or("");
                let type_name = column.attr.type_name.as_deref().unwrap_or("");
                format_complex(
                    element,
                    type_schema,
                    type_name,
                    types,
                    &column.lobfolder,
                    accessor,
                    logger,
                    stats,
                    0,
                    &tree_path,
                )
            } else {
                let affinity = affinity::siard_to_affinity(column.attr.type_.as_deref().unwrap_or(""));
                format_simple(
                    affinity,
                    element,
                    &column.lobfolder,
                    &tree_path,
                    false,
                    accessor,
                    logger,
                    stats,
                )
            };

            parts.push(rendered);
        }

        writeln!(sink, "INSERT INTO '{}' VALUES (\n{});", table_name, parts.join(",\n"))?;
        stats.rows += 1;
    }

    Ok(())
}

/// Renders a simple-column cell. `textify` forces a `CAST(... AS TEXT)`
/// wrapper even for a BLOB-affinity LOB, used when this value is nested
/// inside a JSON wrapper (open question 1: always textify inside JSON).
#[allow(clippy::too_many_arguments)]
fn format_simple(
    affinity: Affinity,
    element: Option<Element<'_>>,
    lobfolder: &LobFolderInfo,
    tree_path: &str,
    textify: bool,
    accessor: &mut ArchiveAccessor<'_>,
    logger: &mut Logger,
    stats: &mut Stats,
) -> String {
    let element = match element {
        Some(element) => element,
        None => return "''".to_string(),
    };

    if let Some(file) = element.attribute("file") {
        let folder = lobfolder.real_folder_for(tree_path).unwrap_or("");
        let lob_uri = if folder.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", folder, file)
        };

        let mut out = String::new();
        let ok = if textify || affinity == Affinity::Text {
            out.push_str("CAST(");
            let ok = lob::materialize(accessor, &lob_uri, &mut out, logger);
            out.push_str(" AS TEXT)");
            ok
        } else {
            lob::materialize(accessor, &lob_uri, &mut out, logger)
        };
        if ok {
            stats.lobs_materialized += 1;
        } else {
            stats.lobs_failed += 1;
        }
        return out;
    }

    match element.raw_text() {
        None => "''".to_string(),
        Some(text) => match affinity {
            Affinity::Integer | Affinity::Real | Affinity::Numeric => text.to_string(),
            _ => {
                if !decode::needs_decode(text) {
                    decode::sqlite_quote(text)
                } else {
                    decode::cast_blob_as_text(&decode::decode(text))
                }
            }
        },
    }
}

/// Renders a complex-column cell (array/udt/distinct), recursing through
/// nested attributes (spec §4.G).
#[allow(clippy::too_many_arguments)]
fn format_complex(
    element: Option<Element<'_>>,
    type_schema: &str,
    type_name: &str,
    types: &TypeTable,
    lobfolder: &LobFolderInfo,
    accessor: &mut ArchiveAccessor<'_>,
    logger: &mut Logger,
    stats: &mut Stats,
    depth: u32,
    tree_path: &str,
) -> String {
    if depth > MAX_DEPTH {
        logger.warn(format!("type recursion limit exceeded at {}", tree_path));
        return "''".to_string();
    }

    if element.is_none() {
        return "''".to_string();
    }

    match types.lookup(type_schema, type_name) {
        None => {
            let affinity = affinity::siard_to_affinity(type_name);
            format_simple(affinity, element, lobfolder, tree_path, true, accessor, logger, stats)
        }
        Some(node) => match node.category {
            TypeCategory::Array => {
                let element_type = node.element();
                let card = element_type.cardinality;
                let (inner_schema, inner_name) = element_type_ref(element_type);

                let mut items = Vec::with_capacity(card as usize);
                for i in 1..=card {
                    let child = element.and_then(|e| e.child(&format!("a{}", i)));
                    let child_path = format!("{}/a{}", tree_path, i);
                    items.push(format_complex(
                        child,
                        &inner_schema,
                        &inner_name,
                        types,
                        lobfolder,
                        accessor,
                        logger,
                        stats,
                        depth + 1,
                        &child_path,
                    ));
                }
                format!("json_array(\n{})", items.join(",\n"))
            }
            TypeCategory::Distinct => {
                let base = node.element().base.clone().unwrap_or_default();
                format_complex(
                    element, "", &base, types, lobfolder, accessor, logger, stats, depth + 1, tree_path,
                )
            }
            TypeCategory::Udt => {
                let mut entries = Vec::with_capacity(node.attributes.len());
                for (k, attr) in node.attributes.iter().enumerate() {
                    let child = element.and_then(|e| e.child(&format!("u{}", k + 1)));
                    let attname = attr.name.clone().unwrap_or_default();
                    let child_path = format!("{}/{}", tree_path, attname);
                    let (inner_schema, inner_name) = element_type_ref(attr);
                    let rendered = format_complex(
                        child,
                        &inner_schema,
                        &inner_name,
                        types,
                        lobfolder,
                        accessor,
                        logger,
                        stats,
                        depth + 1,
                        &child_path,
                    );
                    entries.push(format!("'{}', {}", attname, rendered));
                }
                format!("json_object(\n{})", entries.join(",\n"))
            }
        },
    }
}

/// An attribute's element-type reference: a simple SIARD type string when
/// `type_` is set, otherwise a `(schema, name)` complex-type reference.
fn element_type_ref(attr: &TypeAttribute) -> (String, String) {
    if let Some(ty) = &attr.type_ {
        (String::new(), ty.clone())
    } else {
        (
            attr.type_schema.clone().unwrap_or_default(),
            attr.type_name.clone().unwrap_or_default(),
        )
    }
}
