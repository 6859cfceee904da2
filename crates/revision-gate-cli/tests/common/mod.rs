// crates/revision-gate-cli/tests/common/mod.rs
// =============================================================================
// Module: CLI Test Helpers
// Description: Temporary run workspaces with synthesized inputs.
// Purpose: Drive the pipeline against real files without binary fixtures.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Helpers fail loudly on invalid fixtures.")]

use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use revision_gate_cli::pipeline::RunRequest;
use revision_gate_config::LimitsConfig;
use revision_gate_core::RunId;
use revision_gate_core::Timestamp;
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Run id used by single-run tests.
pub const RUN_ID: &str = "20260212T120000Z_TEST01";
/// Second run id for rerun tests.
pub const RERUN_ID: &str = "20260213T090000Z_TEST02";

/// Content types part.
const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

/// Two questions, each followed by the paragraph its patch edits.
pub const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>Q1. Market size</w:t></w:r></w:p>
<w:p><w:r><w:t>Growth was 12% in 2022.</w:t></w:r></w:p>
<w:p><w:r><w:t>Q2. Outlook</w:t></w:r></w:p>
<w:p><w:r><w:t>Prices will rise next year.</w:t></w:r></w:p>
<w:sectPr/></w:body></w:document>"#;

/// Footnote part holding only the separators.
const FOOTNOTES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:footnotes xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote><w:footnote w:type="continuationSeparator" w:id="0"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:footnote></w:footnotes>"#;

/// Q1 is backed by a fulltext source; Q2 only by an abstract.
pub const PATCH_SPEC: &str = r#"{
  "patches": [
    {
      "patch_id": "market-size",
      "question_id": "Q1",
      "anchor": "12% in 2022",
      "replacement": "15% in 2024",
      "reason": "Updated to the 2024 outlook",
      "source_refs": ["oecd-2024"],
      "footnote_refs": ["fn:oecd"]
    },
    {
      "patch_id": "outlook",
      "question_id": "Q2",
      "anchor": "rise next year",
      "replacement": "stabilise next year",
      "reason": "Revised forecast",
      "source_refs": ["imf-brief"]
    }
  ],
  "footnote_sources": {
    "oecd": "OECD Economic Outlook 2024."
  }
}"#;

/// Registry snapshot.
pub const SOURCES_TOML: &str = r#"
[sources.oecd-2024]
kind = "required"
fulltext_available = true
locator = "library/oecd-2024.pdf"

[sources.imf-brief]
kind = "required"
fulltext_available = false
locator = "https://example.org/imf-brief"
"#;

/// Gate declarations.
pub const GATES_JSON: &str = r#"{
  "Q1": { "required_sources": ["oecd-2024"] },
  "Q2": { "required_sources": ["imf-brief"], "claim": "core" }
}"#;

/// Builds a package from named entries.
pub fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish package").into_inner()
}

/// Input document package.
pub fn input_docx() -> Vec<u8> {
    package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("word/document.xml", DOCUMENT_XML.as_bytes()),
        ("word/footnotes.xml", FOOTNOTES_XML.as_bytes()),
    ])
}

/// Reads one package entry as text.
pub fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open package");
    let mut entry = archive.by_name(name).expect("entry present");
    let mut out = String::new();
    entry.read_to_string(&mut out).expect("read entry");
    out
}

/// Temporary directory holding run inputs and the runs root.
pub struct Workspace {
    /// Owned temporary directory.
    dir: TempDir,
}

impl Workspace {
    /// Writes the standard inputs.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let workspace = Self {
            dir,
        };
        workspace.write("input.docx", &input_docx());
        workspace.write("patches.json", PATCH_SPEC.as_bytes());
        workspace.write("sources.toml", SOURCES_TOML.as_bytes());
        workspace.write("gates.json", GATES_JSON.as_bytes());
        workspace
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a workspace file.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes or replaces a workspace file.
    pub fn write(&self, name: &str, bytes: &[u8]) {
        fs::write(self.path(name), bytes).expect("write input");
    }

    /// Runs root.
    pub fn runs_root(&self) -> PathBuf {
        self.path("runs")
    }

    /// Request for the standard inputs.
    pub fn request(&self, run_id: &str) -> RunRequest {
        RunRequest {
            input_docx: self.path("input.docx"),
            patch_spec: self.path("patches.json"),
            sources: self.path("sources.toml"),
            gate_config: self.path("gates.json"),
            run_id: RunId::new(run_id),
            runs_root: self.runs_root(),
            author: "Test Author".to_string(),
            timestamp: Timestamp::UnixMillis(1_770_897_600_000),
            require_clean_baseline: false,
            verify_after_write: true,
            limits: LimitsConfig::default(),
        }
    }
}
