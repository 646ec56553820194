//! Metadata Walker: traverses the `siardArchive` DOM, emits `CREATE
//! TABLE`/index statements, and drives the Content Emitter per table
//! (spec §4.F).

use std::io::Write;
use std::path::Path;

use regex::Regex;

use crate::archive::ArchiveAccessor;
use crate::content::{self, ColumnSpec};
use crate::error::MetadataError;
use crate::logger::Logger;
use crate::stats::Stats;
use crate::types::{ElementType, ExtendedCategory, TypeAttribute, TypeNode, TypeTable};
use crate::xml::Element;

/// Runs the full walk: pre-pass type registration, then per-schema,
/// per-table emission. `siard_uri` is the resolved root the content and
/// LOB paths are built against.
#[allow(clippy::too_many_arguments)]
pub fn run(
    root: Element<'_>,
    types: &mut TypeTable,
    schema_filter: &Regex,
    sink: &mut dyn Write,
    accessor: &mut ArchiveAccessor<'_>,
    stats: &mut Stats,
    logger: &mut Logger,
    siard_uri: &str,
    verbose: bool,
) -> Result<(), MetadataError> {
    let version = root.attribute("version").unwrap_or("unknown");
    let schemas: Vec<Element<'_>> = root
        .child("schemas")
        .map(|el| el.children_named("schema").collect())
        .unwrap_or_default();

    writeln!(sink, "-- siard version={}", version).map_err(crate::error::ArchiveError::Io)?;
    writeln!(sink, "-- no. of schemas={}", schemas.len()).map_err(crate::error::ArchiveError::Io)?;

    for schema in &schemas {
        let schema_name = schema.child_text("name").unwrap_or_default();
        prepass_register_types(*schema, schema_name, types, logger);
    }

    let archive_lobfolder = root.child_text("lobFolder");
    let mut seen_tables = std::collections::HashSet::new();
    let mut unique_index_counter: u64 = 0;

    for schema in &schemas {
        let schema_name = schema.child_text("name").unwrap_or_default();
        if !schema_filter.is_match(schema_name) {
            continue;
        }
        stats.schemas += 1;

        let schema_folder = schema.child_text("folder").unwrap_or(schema_name);
        let tables: Vec<Element<'_>> = schema
            .child("tables")
            .map(|el| el.children_named("table").collect())
            .unwrap_or_default();

        for table in tables {
            let table_name = table.child_text("name").unwrap_or_default();
            if table_name.is_empty() {
                continue;
            }
            if !seen_tables.insert(table_name.to_string()) {
                stats.duplicate_tables += 1;
                logger.warn(format!("duplicate table name {} skipped", table_name));
                continue;
            }
            stats.tables += 1;

            let table_folder = table.child_text("folder").unwrap_or(table_name);
            let columns_el = table.child("columns");
            let column_elements: Vec<Element<'_>> = columns_el
                .map(|el| el.children_named("column").collect())
                .unwrap_or_default();

            let mut columns = Vec::with_capacity(column_elements.len());
            for column_el in &column_elements {
                let name = column_el.child_text("name").unwrap_or_default().to_string();
                let mut attr = type_attribute_from_element(*column_el);

                if attr.extended_category() == ExtendedCategory::Array {
                    let generated = lift_array(types, schema_name, &name, &attr);
                    attr.rewrite_as_reference(schema_name, &generated);
                }

                let lobfolder =
                    crate::lobfolder::LobFolderInfo::init(siard_uri, *column_el, &name, archive_lobfolder);
                columns.push(ColumnSpec::new(name, attr, lobfolder));
            }

            emit_create_table(sink, table_name, &columns, table)
                .map_err(crate::error::ArchiveError::Io)?;

            let content_path = format!(
                "{}/content/{}/{}/{}.xml",
                siard_uri,
                schema_folder,
                table_folder,
                basename(table_folder)
            );
            match accessor.resolve(&content_path) {
                Ok(resolved) => {
                    if let Err(err) =
                        content::emit_table(table_name, &columns, types, &resolved, accessor, logger, stats, sink)
                    {
                        logger.warn(format!("table {} content load failed: {}", table_name, err));
                    }
                }
                Err(err) => {
                    logger.warn(format!("table {} content not found: {}", table_name, err));
                }
            }

            if verbose {
                logger.info(format!("table {} emitted", table_name));
            }

            if let Some(candidate_keys) = table.child("candidateKeys") {
                for candidate_key in candidate_keys.children_named("candidateKey") {
                    let key_name = candidate_key.child_text("name").unwrap_or_default();
                    let key_columns: Vec<&str> = candidate_key
                        .children_named("column")
                        .filter_map(|c| c.text())
                        .collect();
                    if key_columns.is_empty() {
                        continue;
                    }
                    writeln!(
                        sink,
                        "CREATE UNIQUE INDEX unique_idx{}_{} ON {} (\n  {});",
                        unique_index_counter,
                        key_name,
                        table_name,
                        key_columns.join(",\n  ")
                    )
                    .map_err(crate::error::ArchiveError::Io)?;
                    unique_index_counter += 1;
                }
            }
        }
    }

    Ok(())
}

fn emit_create_table(
    sink: &mut dyn Write,
    table_name: &str,
    columns: &[ColumnSpec],
    table: Element<'_>,
) -> std::io::Result<()> {
    let column_lines: Vec<String> = columns
        .iter()
        .map(|col| {
            let affinity = if col.complex {
                "TEXT".to_string()
            } else {
                crate::affinity::siard_to_affinity(col.attr.type_.as_deref().unwrap_or("")).to_string()
            };
            format!("'{}' {}", col.name, affinity)
        })
        .collect();

    let mut body = column_lines.join(",\n");

    if let Some(pk) = table.child("primaryKey") {
        let pk_columns: Vec<&str> = pk.children_named("column").filter_map(|c| c.text()).collect();
        if !pk_columns.is_empty() {
            body.push_str(&format!(",\n   PRIMARY KEY (\n   {})", pk_columns.join(",\n   ")));
        }
    }

    writeln!(sink, "CREATE TABLE '{}' (\n{});", table_name, body)
}

fn prepass_register_types(schema: Element<'_>, schema_name: &str, types: &mut TypeTable, logger: &mut Logger) {
    let types_el = match schema.child("types") {
        Some(el) => el,
        None => return,
    };

    for type_el in types_el.children_named("type") {
        let name = type_el.child_text("name").unwrap_or_default();
        let category = type_el.child_text("category").unwrap_or_default();
        if name.is_empty() || category.is_empty() {
            continue;
        }

        match category {
            "distinct" => {
                let base = type_el.child_text("base").unwrap_or_default();
                types.register(schema_name, name, TypeNode::distinct(schema_name, name, base));
            }
            "udt" => {
                let mut attributes = Vec::new();
                if let Some(attributes_el) = type_el.child("attributes") {
                    for attribute_el in attributes_el.children_named("attribute") {
                        let mut attr = type_attribute_from_element(attribute_el);
                        match attr.extended_category() {
                            ExtendedCategory::Array => {
                                let attr_name = attr.name.clone().unwrap_or_default();
                                let generated = lift_array(types, schema_name, &attr_name, &attr);
                                attr.rewrite_as_reference(schema_name, &generated);
                            }
                            ExtendedCategory::Distinct => {
                                logger.warn(format!(
                                    "udt {}.{} attribute {:?} references a distinct type, which is not allowed",
                                    schema_name, name, attr.name
                                ));
                            }
                            _ => {}
                        }
                        attributes.push(attr);
                    }
                }
                types.register(schema_name, name, TypeNode::udt(schema_name, name, attributes));
            }
            _ => {}
        }
    }
}

fn lift_array(types: &mut TypeTable, schema: &str, subname: &str, attr: &TypeAttribute) -> String {
    let element = if let Some(ty) = &attr.type_ {
        ElementType::Simple(ty)
    } else {
        ElementType::Complex {
            schema: attr.type_schema.as_deref().unwrap_or(""),
            name: attr.type_name.as_deref().unwrap_or(""),
        }
    };
    types.register_array(schema, subname, element, attr.cardinality)
}

fn type_attribute_from_element(el: Element<'_>) -> TypeAttribute {
    TypeAttribute {
        name: el.child_text("name").map(String::from),
        type_: el.child_text("type").map(String::from),
        type_schema: el.child_text("typeSchema").map(String::from),
        type_name: el.child_text("typeName").map(String::from),
        cardinality: el.child_text("cardinality").and_then(|s| s.parse().ok()).unwrap_or(0),
        base: el.child_text("base").map(String::from),
    }
}

fn basename(folder: &str) -> &str {
    Path::new(folder)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveAccessor;
    use crate::workspace::Workspace;
    use crate::xml::Document;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn setup(xml_dir: &Path, table_xml: &str) {
        fs::create_dir_all(xml_dir.join("content/S/table0")).unwrap();
        fs::write(xml_dir.join("content/S/table0/table0.xml"), table_xml).unwrap();
    }

    #[test]
    fn s1_end_to_end_table_and_row() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        setup(
            tmp.path(),
            r#"<table><row><c1>1</c1><c2>O'Hara</c2></row></table>"#,
        );

        let metadata_xml = r#"
            <siardArchive version="2.1">
              <schemas>
                <schema>
                  <folder>S</folder>
                  <name>S</name>
                  <tables>
                    <table>
                      <folder>table0</folder>
                      <name>T</name>
                      <columns>
                        <column><name>a</name><type>INTEGER</type></column>
                        <column><name>b</name><type>VARCHAR(8)</type></column>
                      </columns>
                    </table>
                  </tables>
                </schema>
              </schemas>
            </siardArchive>
        "#;
        let doc = Document::parse(metadata_xml).unwrap();

        let mut accessor = ArchiveAccessor::new(&ws);
        let mut types = TypeTable::new();
        let mut stats = Stats::default();
        let mut logger = Logger::new(tmp.path().join("log")).unwrap();
        let schema_filter = Regex::new("(?i)").unwrap();
        let mut sink = Vec::new();

        run(
            doc.root_element(),
            &mut types,
            &schema_filter,
            &mut sink,
            &mut accessor,
            &mut stats,
            &mut logger,
            tmp.path().to_str().unwrap(),
            false,
        )
        .unwrap();

        let output = String::from_utf8(sink).unwrap();
        assert!(output.contains("CREATE TABLE 'T' (\n'a' INTEGER,\n'b' TEXT);\n"));
        assert!(output.contains("INSERT INTO 'T' VALUES (\n1,\n'O''Hara');\n"));
        assert_eq!(stats.tables, 1);
        assert_eq!(stats.rows, 1);
    }

    #[test]
    fn s6_primary_key_and_candidate_key() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        setup(tmp.path(), r#"<table></table>"#);

        let metadata_xml = r#"
            <siardArchive version="2.1">
              <schemas>
                <schema>
                  <folder>S</folder>
                  <name>S</name>
                  <tables>
                    <table>
                      <folder>table0</folder>
                      <name>T</name>
                      <columns>
                        <column><name>a</name><type>INTEGER</type></column>
                        <column><name>b</name><type>INTEGER</type></column>
                      </columns>
                      <primaryKey>
                        <column>a</column>
                        <column>b</column>
                      </primaryKey>
                      <candidateKeys>
                        <candidateKey>
                          <name>u1</name>
                          <column>b</column>
                        </candidateKey>
                      </candidateKeys>
                    </table>
                  </tables>
                </schema>
              </schemas>
            </siardArchive>
        "#;
        let doc = Document::parse(metadata_xml).unwrap();

        let mut accessor = ArchiveAccessor::new(&ws);
        let mut types = TypeTable::new();
        let mut stats = Stats::default();
        let mut logger = Logger::new(tmp.path().join("log")).unwrap();
        let schema_filter = Regex::new("(?i)").unwrap();
        let mut sink = Vec::new();

        run(
            doc.root_element(),
            &mut types,
            &schema_filter,
            &mut sink,
            &mut accessor,
            &mut stats,
            &mut logger,
            tmp.path().to_str().unwrap(),
            false,
        )
        .unwrap();

        let output = String::from_utf8(sink).unwrap();
        assert!(output.contains("PRIMARY KEY (\n   a,\n   b)"));
        assert!(output.contains("CREATE UNIQUE INDEX unique_idx0_u1 ON T (\n  b);\n"));
    }

    #[test]
    fn s3_column_lobfolder_override_is_applied_to_lob_lookup() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        setup(tmp.path(), r#"<table><row><c1 file="lob0"/></row></table>"#);

        fs::create_dir_all(tmp.path().join("lobs")).unwrap();
        fs::write(tmp.path().join("lobs/lob0"), [0x00u8, 0xff, 0x10]).unwrap();

        let metadata_xml = r#"
            <siardArchive version="2.1">
              <schemas>
                <schema>
                  <folder>S</folder>
                  <name>S</name>
                  <tables>
                    <table>
                      <folder>table0</folder>
                      <name>T</name>
                      <columns>
                        <column>
                          <name>c1</name>
                          <type>BLOB</type>
                          <lobFolder>lobs</lobFolder>
                        </column>
                      </columns>
                    </table>
                  </tables>
                </schema>
              </schemas>
            </siardArchive>
        "#;
        let doc = Document::parse(metadata_xml).unwrap();

        let mut accessor = ArchiveAccessor::new(&ws);
        let mut types = TypeTable::new();
        let mut stats = Stats::default();
        let mut logger = Logger::new(tmp.path().join("log")).unwrap();
        let schema_filter = Regex::new("(?i)").unwrap();
        let mut sink = Vec::new();

        run(
            doc.root_element(),
            &mut types,
            &schema_filter,
            &mut sink,
            &mut accessor,
            &mut stats,
            &mut logger,
            tmp.path().to_str().unwrap(),
            false,
        )
        .unwrap();

        let output = String::from_utf8(sink).unwrap();
        assert!(output.contains("INSERT INTO 'T' VALUES (\nX'00ff10');\n"));
        assert_eq!(stats.lobs_materialized, 1);
        assert_eq!(stats.lobs_failed, 0);
    }

    #[test]
    fn schema_filter_excludes_non_matching_schemas() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::new(tmp.path()).unwrap();
        setup(tmp.path(), r#"<table></table>"#);

        let metadata_xml = r#"
            <siardArchive version="2.1">
              <schemas>
                <schema><folder>S</folder><name>S</name><tables></tables></schema>
              </schemas>
            </siardArchive>
        "#;
        let doc = Document::parse(metadata_xml).unwrap();

        let mut accessor = ArchiveAccessor::new(&ws);
        let mut types = TypeTable::new();
        let mut stats = Stats::default();
        let mut logger = Logger::new(tmp.path().join("log")).unwrap();
        let schema_filter = Regex::new("^$").unwrap();
        let mut sink = Vec::new();

        run(
            doc.root_element(),
            &mut types,
            &schema_filter,
            &mut sink,
            &mut accessor,
            &mut stats,
            &mut logger,
            tmp.path().to_str().unwrap(),
            false,
        )
        .unwrap();

        assert_eq!(stats.schemas, 0);
        assert!(!String::from_utf8(sink).unwrap().contains("CREATE TABLE"));
    }
}
