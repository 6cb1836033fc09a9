//! Project export/import in the versioned `.workshop.json` format.

pub mod exporter;
pub mod importer;
pub mod types;

pub use exporter::{
    build_export, build_exported_project, ensure_slug, export_project, export_project_file,
};
pub use importer::{build_project_from_export, import_project, parse_project_file};
pub use types::{
    ExportFile, ExportedProject, ProjectExportV1, CREATION_LAB_SIGNATURE, EXPORT_FILE_SUFFIX,
    EXPORT_SCHEMA_VERSION,
};
