//! Orchestrates one full translation run: acquire a workspace, resolve and
//! parse `metadata.xml`, walk it (summary or full translate), and tear the
//! workspace down on every exit path.

use std::fs::{self, File};
use std::io::Write as _;

use crate::archive::ArchiveAccessor;
use crate::config::{Mode, RunConfig};
use crate::error::{MetadataError, TranslateError};
use crate::logger::Logger;
use crate::metadata;
use crate::stats::Stats;
use crate::types::TypeTable;
use crate::workspace::Workspace;
use crate::xml::{Document, Element};

const LOG_FILE: &str = "siard2sql.log";

pub fn run(config: &RunConfig) -> Result<Stats, TranslateError> {
    let workspace = Workspace::new(&config.tmpdir_root).map_err(TranslateError::Write)?;
    let mut logger = Logger::new(workspace.join(LOG_FILE)).map_err(TranslateError::Write)?;
    logger.info(format!("workspace acquired at {}", workspace.path().display()));

    let mut accessor = ArchiveAccessor::with_unzip_mode(&workspace, config.unzip_mode);
    let siard_uri = config.input.to_string_lossy().into_owned();
    let metadata_uri = crate::config::metadata_uri(&config.input);

    let metadata_path = accessor
        .resolve(&metadata_uri)
        .map_err(MetadataError::from)?;
    let source = fs::read_to_string(&metadata_path).map_err(MetadataError::Io)?;
    let doc = Document::parse(&source).map_err(MetadataError::Xml)?;
    let root = doc.root_element();

    let mut stats = Stats::default();

    match &config.mode {
        Mode::Summary => print_summary(root),
        Mode::Translate {
            output,
            schema_filter,
        } => {
            let mut types = TypeTable::new();
            let mut sink = File::create(output).map_err(TranslateError::Write)?;

            metadata::run(
                root,
                &mut types,
                schema_filter,
                &mut sink,
                &mut accessor,
                &mut stats,
                &mut logger,
                &siard_uri,
                config.verbosity > 0,
            )?;

            sink.flush().map_err(TranslateError::Write)?;
        }
    }

    accessor.close_all();
    logger.info(format!("run complete: {}", stats));
    workspace.teardown().map_err(TranslateError::Write)?;

    Ok(stats)
}

fn print_summary(root: Element<'_>) {
    let schemas: Vec<_> = root
        .child("schemas")
        .map(|el| el.children_named("schema").collect())
        .unwrap_or_default();

    println!("{} schema(s)", schemas.len());
    for schema in schemas {
        let name = schema.child_text("name").unwrap_or("?");
        let n_tables = schema
            .child("tables")
            .map(|tables| tables.children_named("table").count())
            .unwrap_or(0);
        println!("  {}: {} table(s)", name, n_tables);
    }
}
