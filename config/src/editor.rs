//! Base-editor configuration
//!
//! A base editor is fully described by its PAM, the editing window inside
//! the 20nt guide (1-indexed, counted from the PAM-adjacent end) and its
//! chemistry. Editors come from three sources, merged in this order:
//! built-in presets, a .csv/.tsv/.txt file and inline CLI parameters.
//! Records with the same name override earlier ones. Every record is
//! validated before any design work starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{iupac_bases, ABE_RGB, CBE_RGB, GUIDE_LENGTH};

pub const EDITOR_FILE_COLUMNS: [&str; 5] = [
    "base_editor_name",
    "pam_sequence",
    "editing_window_start",
    "editing_window_end",
    "base_editor_type",
];

// key, name, pam, window start, window end, chemistry
const PRESETS: [(&str, &str, &str, usize, usize, EditorType); 6] = [
    ("target-aid-ngg", "Target-AID_NGG", "NGG", 17, 19, EditorType::Cbe),
    ("target-aid-ng", "Target-AID_NG", "NG", 17, 19, EditorType::Cbe),
    ("be4max-ngg", "BE4max_NGG", "NGG", 13, 17, EditorType::Cbe),
    ("be4max-ng", "BE4max_NG", "NG", 13, 17, EditorType::Cbe),
    ("abe8e-ngg", "ABE8e_NGG", "NGG", 13, 17, EditorType::Abe),
    ("abe8e-ng", "ABE8e_NG", "NG", 13, 17, EditorType::Abe),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ERROR: base editor '{editor}' is missing field '{field}'")]
    MissingField { editor: String, field: &'static str },
    #[error("ERROR: base editor '{editor}' has a non-numeric '{field}': '{value}'")]
    InvalidWindow {
        editor: String,
        field: &'static str,
        value: String,
    },
    #[error("ERROR: base editor '{editor}' has an invalid editing window {start}-{end} [expected 1 <= start <= end <= 20]")]
    InvalidRange {
        editor: String,
        start: usize,
        end: usize,
    },
    #[error("ERROR: base editor '{editor}' has an invalid PAM '{pam}' [expected IUPAC codes]")]
    InvalidPam { editor: String, pam: String },
    #[error("ERROR: unrecognized base editor type '{0}' [expected cbe or abe]")]
    UnknownEditorType(String),
    #[error("ERROR: unknown base editor preset '{preset}'. Available presets: {available}")]
    UnknownPreset { preset: String, available: String },
    #[error("ERROR: unsupported base editor file extension for {0:?} [expected .csv, .tsv or .txt]")]
    UnsupportedExtension(String),
    #[error("ERROR: base editor file columns are invalid. Expected {expected}, got {found}")]
    InvalidColumns { expected: String, found: String },
    #[error("ERROR: inline base editor information is incomplete, missing: {0}")]
    IncompleteInline(String),
    #[error("ERROR: could not read base editor file: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EditorType {
    Cbe,
    Abe,
}

impl EditorType {
    pub fn rgb(&self) -> &'static str {
        match self {
            EditorType::Cbe => CBE_RGB,
            EditorType::Abe => ABE_RGB,
        }
    }
}

impl FromStr for EditorType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cbe" => Ok(EditorType::Cbe),
            "abe" => Ok(EditorType::Abe),
            _ => Err(ConfigError::UnknownEditorType(s.to_string())),
        }
    }
}

impl fmt::Display for EditorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EditorType::Cbe => write!(f, "cbe"),
            EditorType::Abe => write!(f, "abe"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct BaseEditor {
    pub name: String,
    pub pam: String,
    pub window_start: usize,
    pub window_end: usize,
    pub editor_type: EditorType,
}

impl BaseEditor {
    pub fn new(
        name: &str,
        pam: &str,
        window_start: usize,
        window_end: usize,
        editor_type: EditorType,
    ) -> Result<Self, ConfigError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                editor: String::from("<unnamed>"),
                field: "base_editor_name",
            });
        }

        let pam = pam.trim().to_uppercase();
        if pam.is_empty() {
            return Err(ConfigError::MissingField {
                editor: name.to_string(),
                field: "pam_sequence",
            });
        }
        if pam.chars().any(|c| iupac_bases(c).is_none()) {
            return Err(ConfigError::InvalidPam {
                editor: name.to_string(),
                pam,
            });
        }

        if window_start < 1 || window_start > window_end || window_end > GUIDE_LENGTH {
            return Err(ConfigError::InvalidRange {
                editor: name.to_string(),
                start: window_start,
                end: window_end,
            });
        }

        Ok(Self {
            name: name.to_string(),
            pam,
            window_start,
            window_end,
            editor_type,
        })
    }

    /// build an editor from raw text fields [file rows, CLI values]
    pub fn from_fields(
        name: &str,
        pam: &str,
        window_start: &str,
        window_end: &str,
        editor_type: &str,
    ) -> Result<Self, ConfigError> {
        let editor = if name.trim().is_empty() {
            String::from("<unnamed>")
        } else {
            name.trim().to_string()
        };

        let parse = |value: &str, field: &'static str| -> Result<usize, ConfigError> {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    editor: editor.clone(),
                    field,
                });
            }
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidWindow {
                    editor: editor.clone(),
                    field,
                    value: value.to_string(),
                })
        };

        let start = parse(window_start, "editing_window_start")?;
        let end = parse(window_end, "editing_window_end")?;

        if editor_type.trim().is_empty() {
            return Err(ConfigError::MissingField {
                editor,
                field: "base_editor_type",
            });
        }
        let editor_type = editor_type.parse::<EditorType>()?;

        BaseEditor::new(name, pam, start, end, editor_type)
    }

    pub fn rgb(&self) -> &'static str {
        self.editor_type.rgb()
    }
}

impl fmt::Display for BaseEditor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (Type: {}, PAM: {}, Window: {}-{})",
            self.name, self.editor_type, self.pam, self.window_start, self.window_end
        )
    }
}

/// name-keyed, insertion-ordered collection of editors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EditorSet {
    editors: Vec<BaseEditor>,
}

impl EditorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, editor: BaseEditor) {
        match self.editors.iter_mut().find(|e| e.name == editor.name) {
            Some(slot) => {
                log::warn!("Base editor {} is defined twice, keeping the last one", editor.name);
                *slot = editor;
            }
            None => self.editors.push(editor),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BaseEditor> {
        self.editors.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BaseEditor> {
        self.editors.iter()
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }
}

impl FromIterator<BaseEditor> for EditorSet {
    fn from_iter<I: IntoIterator<Item = BaseEditor>>(iter: I) -> Self {
        let mut set = EditorSet::new();
        iter.into_iter().for_each(|e| set.insert(e));
        set
    }
}

/// inline editor parameters, all or none must be given
#[derive(Debug, Default, Clone)]
pub struct InlineEditor {
    pub name: Option<String>,
    pub pam: Option<String>,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub editor_type: Option<String>,
}

impl InlineEditor {
    pub fn resolve(&self) -> Result<Option<BaseEditor>, ConfigError> {
        let fields = [
            ("--be-name", &self.name),
            ("--be-pam", &self.pam),
            ("--be-start", &self.window_start),
            ("--be-end", &self.window_end),
            ("--be-type", &self.editor_type),
        ];

        if fields.iter().all(|(_, v)| v.is_none()) {
            return Ok(None);
        }

        let missing = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ConfigError::IncompleteInline(missing.join(", ")));
        }

        let get = |v: &Option<String>| v.clone().unwrap_or_default();
        BaseEditor::from_fields(
            &get(&self.name),
            &get(&self.pam),
            &get(&self.window_start),
            &get(&self.window_end),
            &get(&self.editor_type),
        )
        .map(Some)
    }
}

pub fn preset_keys() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.0).collect()
}

pub fn get_preset(key: &str) -> Result<BaseEditor, ConfigError> {
    let key = key.trim().to_lowercase();
    PRESETS
        .iter()
        .find(|p| p.0 == key || p.1.to_lowercase() == key)
        .map(|&(_, name, pam, start, end, kind)| BaseEditor {
            name: name.to_string(),
            pam: pam.to_string(),
            window_start: start,
            window_end: end,
            editor_type: kind,
        })
        .ok_or_else(|| ConfigError::UnknownPreset {
            preset: key.clone(),
            available: preset_keys().join(", "),
        })
}

pub fn all_presets() -> EditorSet {
    PRESETS
        .iter()
        .map(|&(_, name, pam, start, end, kind)| BaseEditor {
            name: name.to_string(),
            pam: pam.to_string(),
            window_start: start,
            window_end: end,
            editor_type: kind,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct EditorRecord {
    base_editor_name: String,
    pam_sequence: String,
    editing_window_start: String,
    editing_window_end: String,
    base_editor_type: String,
}

/// read base editors from a .csv [comma] or .tsv/.txt [tab] file
pub fn read_editor_file<P: AsRef<Path>>(path: P) -> Result<Vec<BaseEditor>, ConfigError> {
    let path = path.as_ref();
    let delimiter = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("csv") => b',',
        Some("tsv") | Some("txt") => b'\t',
        _ => return Err(ConfigError::UnsupportedExtension(path.display().to_string())),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut found = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let mut expected = EDITOR_FILE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>();
    found.sort();
    expected.sort();

    if found != expected {
        return Err(ConfigError::InvalidColumns {
            expected: EDITOR_FILE_COLUMNS.join(", "),
            found: headers.iter().collect::<Vec<_>>().join(", "),
        });
    }

    let mut editors = Vec::new();
    for record in reader.deserialize::<EditorRecord>() {
        let record = record?;
        editors.push(BaseEditor::from_fields(
            &record.base_editor_name,
            &record.pam_sequence,
            &record.editing_window_start,
            &record.editing_window_end,
            &record.base_editor_type,
        )?);
    }

    Ok(editors)
}

/// merge every editor source into one validated set
///
/// No source at all means every preset is used.
pub fn build_editor_set(
    presets: &[String],
    file: Option<&Path>,
    inline: &InlineEditor,
) -> Result<EditorSet, ConfigError> {
    let inline = inline.resolve()?;

    if presets.is_empty() && file.is_none() && inline.is_none() {
        log::info!("No base editors given, using all presets");
        return Ok(all_presets());
    }

    let mut set = EditorSet::new();
    for key in presets {
        set.insert(get_preset(key)?);
    }

    if let Some(file) = file {
        read_editor_file(file)?
            .into_iter()
            .for_each(|e| set.insert(e));
    }

    if let Some(editor) = inline {
        set.insert(editor);
    }

    Ok(set)
}
