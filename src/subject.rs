// Subject folders on disk. A subject is one directory under the data root
// holding an `avatar.json` descriptor and up to four photos; this module
// scans the root, loads and normalizes the descriptor and writes the
// avatar id back after creation.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Descriptor file expected in every subject directory.
pub const METADATA_FILE: &str = "avatar.json";

/// At most this many photos are used per subject; extra files are ignored.
pub const MAX_IMAGES: usize = 4;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Body model gender accepted by the fitting endpoint. Serializes
/// lowercase, matching the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Neutral,
}

impl Gender {
    /// Lenient parse: surrounding whitespace and letter case are ignored.
    /// Returns None for anything that is not one of the three values.
    pub fn from_raw(raw: &str) -> Option<Gender> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "female" => Some(Gender::Female),
            "male" => Some(Gender::Male),
            "neutral" => Some(Gender::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Neutral => "neutral",
        }
    }
}

/// Contents of `avatar.json`. All fields are optional on disk; presence of
/// `height`/`weight` decides whether they are included in the fitting
/// payload, and `avatar_id` is written back once the remote resource
/// exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvatarMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,
}

/// One loaded subject: its folder, normalized metadata and the photos
/// selected for upload.
#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub dir: PathBuf,
    pub metadata: AvatarMetadata,
    pub gender: Gender,
    pub images: Vec<PathBuf>,
}

/// List subject names under the data root: subdirectories that are not
/// hidden (leading dot) and contain an `avatar.json`. Sorted lexically.
/// An empty list is a valid result; a missing data root is an error.
pub fn list_subjects(data_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("Reading data directory {}", data_dir.display()))?;

    let mut subjects = Vec::new();
    for entry in entries {
        let entry = entry.context("Reading data directory entry")?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => continue,
        };
        if name.starts_with('.') {
            continue;
        }
        if path.join(METADATA_FILE).exists() {
            subjects.push(name);
        }
    }
    subjects.sort();
    Ok(subjects)
}

impl Subject {
    /// Load one subject by name: parse `avatar.json`, normalize the gender
    /// (unknown or missing values fall back to neutral with a warning) and
    /// collect up to four photos in file-name order.
    pub fn load(data_dir: &Path, name: &str) -> Result<Subject> {
        let dir = data_dir.join(name);
        let metadata_path = dir.join(METADATA_FILE);
        let raw = fs::read_to_string(&metadata_path)
            .with_context(|| format!("Reading {}", metadata_path.display()))?;
        let mut metadata: AvatarMetadata = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing {}", metadata_path.display()))?;

        let gender = match metadata.gender.as_deref() {
            Some(value) => match Gender::from_raw(value) {
                Some(g) => g,
                None => {
                    warn!("Invalid gender '{}' for {}, defaulting to 'neutral'", value, name);
                    println!(
                        "Warning: Invalid gender '{}' for {}, defaulting to 'neutral'",
                        value, name
                    );
                    Gender::Neutral
                }
            },
            None => {
                warn!("No gender set for {}, defaulting to 'neutral'", name);
                println!("Warning: No gender set for {}, defaulting to 'neutral'", name);
                Gender::Neutral
            }
        };
        // Keep the normalized form so the write-back persists it.
        metadata.gender = Some(gender.as_str().to_string());

        let images = collect_images(&dir)?;

        Ok(Subject {
            name: name.to_string(),
            dir,
            metadata,
            gender,
            images,
        })
    }

    /// Whether a remote avatar id is already recorded for this subject.
    pub fn has_avatar_id(&self) -> bool {
        self.metadata.avatar_id.is_some()
    }

    /// Record the remote avatar id and rewrite `avatar.json`. Called right
    /// after creation, before any image upload.
    pub fn save_avatar_id(&mut self, avatar_id: &str) -> Result<PathBuf> {
        self.metadata.avatar_id = Some(avatar_id.to_string());
        let path = self.dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&self.metadata)
            .context("Serializing avatar metadata")?;
        fs::write(&path, json).with_context(|| format!("Writing {}", path.display()))?;
        Ok(path)
    }

    /// Path where downloaded measurements are stored for this subject.
    pub fn measurements_path(&self) -> PathBuf {
        self.dir.join(crate::measurements::MEASUREMENTS_FILE)
    }
}

/// Collect photo files (jpg/jpeg/png, case-insensitive) in `dir`, sorted
/// by file name and truncated to `MAX_IMAGES`. The 5th and later files are
/// silently ignored.
fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Reading subject directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.context("Reading subject directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    images.truncate(MAX_IMAGES);
    Ok(images)
}
