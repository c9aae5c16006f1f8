//! Export table for cloud-native documents
//!
//! Cloud-native documents (documents, spreadsheets, drawings, ...) have no
//! raw blob to download. They are fetched through an export link in a
//! standard format instead, and the local copy receives the format's
//! extension so it never aliases the document's own path.

/// Target format for exporting a cloud-native document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// MIME type requested from the export links
    pub mime_type: &'static str,
    /// Extension appended to the local file name (without the dot)
    pub extension: &'static str,
}

/// Format used when a document's MIME type has no table entry
pub const DEFAULT_EXPORT: ExportFormat = ExportFormat {
    mime_type: "text/plain",
    extension: "txt",
};

/// Source MIME type -> preferred export format
pub const EXPORT_TABLE: &[(&str, ExportFormat)] = &[
    ("text/plain", DEFAULT_EXPORT),
    (
        "application/vnd.google-apps.drawing",
        ExportFormat {
            mime_type: "image/svg+xml",
            extension: "svg+xml",
        },
    ),
    (
        "application/vnd.google-apps.spreadsheet",
        ExportFormat {
            mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            extension: "xlsx",
        },
    ),
    (
        "application/vnd.google-apps.document",
        ExportFormat {
            mime_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            extension: "docx",
        },
    ),
    (
        "application/vnd.google-apps.presentation",
        ExportFormat {
            mime_type: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            extension: "pptx",
        },
    ),
];

/// Looks up the export format for a source MIME type, falling back to
/// [`DEFAULT_EXPORT`]
#[must_use]
pub fn export_format_for(mime_type: &str) -> ExportFormat {
    EXPORT_TABLE
        .iter()
        .find(|(source, _)| *source == mime_type)
        .map(|(_, format)| *format)
        .unwrap_or(DEFAULT_EXPORT)
}
