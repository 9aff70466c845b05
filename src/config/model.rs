// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::candidate::Category;

/// Top-level configuration as read from a TOML file.
///
/// This is a direct mapping of the config examples:
///
/// ```toml
/// [ledger]
/// base_url = "https://sheets.internal.example"
/// spreadsheet_id = "1mlvbDt4yGq"
///
/// [catalog]
/// base_url = "http://localhost:41595"
///
/// [catalog.folders]
/// props = "M9D82KZ6ELR64"
///
/// [render]
/// command = "mayapy"
/// args = ["render_preview.py", "{scene}", "{output}", "{views}"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    /// Remote ledger location from `[ledger]`.
    #[serde(default)]
    pub ledger: LedgerSection,

    /// Catalog endpoint and folder map from `[catalog]`.
    #[serde(default)]
    pub catalog: CatalogSection,

    /// External render process from `[render]`.
    #[serde(default)]
    pub render: RenderSection,

    /// Exit-code classification table from `[classifier]`.
    #[serde(default)]
    pub classifier: ClassifierSection,

    /// Run-level knobs from `[run]`.
    #[serde(default)]
    pub run: RunSection,
}

/// `[ledger]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Base URL of the row-store values API.
    #[serde(default = "default_ledger_base_url")]
    pub base_url: String,

    /// The shared spreadsheet holding one tab per category.
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Per-category tab name overrides. Categories not listed use their
    /// display name ("Props", "Characters", ...).
    #[serde(default)]
    pub tabs: BTreeMap<Category, String>,
}

fn default_ledger_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            base_url: default_ledger_base_url(),
            spreadsheet_id: String::new(),
            tabs: BTreeMap::new(),
        }
    }
}

impl LedgerSection {
    /// Effective tab name for a category.
    pub fn tab_for(&self, category: Category) -> String {
        self.tabs
            .get(&category)
            .cloned()
            .unwrap_or_else(|| category.display_name().to_string())
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    /// Base URL of the catalog's local API.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Category → catalog folder id, used by the upload step.
    #[serde(default)]
    pub folders: BTreeMap<Category, String>,
}

fn default_catalog_base_url() -> String {
    "http://localhost:41595".to_string()
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            folders: BTreeMap::new(),
        }
    }
}

/// `[render]` section.
///
/// The render process is opaque to the pipeline; the only contract is the
/// command line and the summary hand-off file it leaves behind.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
    /// Executable to launch for each job.
    #[serde(default = "default_render_command")]
    pub command: String,

    /// Argument template. Placeholders expanded per job:
    /// `{scene}` source path, `{output}` output directory,
    /// `{views}` comma-separated requested views.
    #[serde(default = "default_render_args")]
    pub args: Vec<String>,

    /// Kill the render process after this many seconds. `None` preserves
    /// the original behaviour of waiting forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Filename suffix that marks a renderable scene during discovery.
    #[serde(default = "default_scene_suffix")]
    pub scene_suffix: String,
}

fn default_render_command() -> String {
    "mayapy".to_string()
}

fn default_render_args() -> Vec<String> {
    vec![
        "render_preview.py".to_string(),
        "{scene}".to_string(),
        "{output}".to_string(),
        "{views}".to_string(),
    ]
}

fn default_scene_suffix() -> String {
    "_rig.ma".to_string()
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            command: default_render_command(),
            args: default_render_args(),
            timeout_secs: None,
            scene_suffix: default_scene_suffix(),
        }
    }
}

/// `[classifier]` section.
///
/// The exit-code → outcome mapping is configuration, not hardcoded
/// domain knowledge; the defaults match the renderer currently in
/// production use.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    /// Codes meaning the default render layer was unusable.
    #[serde(default = "default_layer_codes")]
    pub layer_codes: Vec<i64>,

    /// Codes meaning the scene contained data the renderer did not
    /// understand.
    #[serde(default = "default_data_codes")]
    pub data_codes: Vec<i64>,

    /// Codes for hard crashes on oversized resources. Negative exit
    /// codes and signal deaths classify the same way regardless of this
    /// list.
    #[serde(default = "default_crash_codes")]
    pub crash_codes: Vec<i64>,
}

fn default_layer_codes() -> Vec<i64> {
    vec![206, 207]
}

fn default_data_codes() -> Vec<i64> {
    vec![211]
}

fn default_crash_codes() -> Vec<i64> {
    // Windows STATUS_ACCESS_VIOLATION and STATUS_STACK_BUFFER_OVERRUN.
    vec![3221225477, 3221225785]
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            layer_codes: default_layer_codes(),
            data_codes: default_data_codes(),
            crash_codes: default_crash_codes(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Durable record of failed jobs, truncated at the start of each run.
    #[serde(default = "default_failures_log")]
    pub failures_log: PathBuf,
}

fn default_failures_log() -> PathBuf {
    PathBuf::from("previewpipe_failures.log")
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            failures_log: default_failures_log(),
        }
    }
}
