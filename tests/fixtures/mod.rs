//! Test fixtures for golden-file assertions
//!
//! - Descriptors with known normalised forms and digests (golden.json)
//! - A small descriptor tree for recursive digesting (tree/)

#![allow(dead_code)]

use compdesc_signing::model::ComponentDescriptor;
use std::path::{Path, PathBuf};

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Path to the golden expectations file
pub fn golden_path() -> PathBuf {
    fixtures_dir().join("golden.json")
}

pub fn tree_root_path() -> PathBuf {
    fixtures_dir().join("tree/root.json")
}

pub fn tree_repository_path() -> PathBuf {
    fixtures_dir().join("tree/repository")
}

/// One golden case: a descriptor file and its expected outputs.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GoldenCase {
    /// Path relative to the fixtures directory
    pub descriptor: String,
    pub normalised: String,
    pub sha256: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GoldenExpectations {
    pub cases: Vec<GoldenCase>,
}

impl GoldenExpectations {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(golden_path())?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl GoldenCase {
    pub fn load_descriptor(&self) -> Result<ComponentDescriptor, Box<dyn std::error::Error>> {
        Ok(ComponentDescriptor::from_file(&fixtures_dir().join(&self.descriptor))?)
    }
}

pub fn load_descriptor(relative: &str) -> ComponentDescriptor {
    ComponentDescriptor::from_file(&fixtures_dir().join(relative))
        .unwrap_or_else(|e| panic!("failed to load fixture {}: {}", relative, e))
}
