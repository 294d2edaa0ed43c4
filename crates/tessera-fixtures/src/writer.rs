//! Rendering fixture documents and writing them once

use crate::canonical::{canonical_value, integrity_hash, sort_keys};
use crate::error::{FixtureError, FixtureResult};
use crate::info::{FixtureInfo, Provenance};
use crate::schema::{Fixture, FixtureFormat};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key of the provenance object inside each fixture
pub const INFO_KEY: &str = "_info";

/// A fixture document ready to be written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFixture {
    /// Scenario id, the top-level key
    pub id: String,
    /// Format
    pub format: FixtureFormat,
    /// Integrity hash of the body
    pub hash: String,
    /// File contents
    pub document: Vec<u8>,
}

/// A fixture that reached disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFixture {
    /// Scenario id
    pub id: String,
    /// Output file
    pub path: PathBuf,
    /// Integrity hash of the body
    pub hash: String,
}

fn validate_id(id: &str) -> FixtureResult<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        || id.starts_with('.');
    if bad {
        return Err(FixtureError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Build `{ "<id>": { ...body, "_info": {...} } }`.
///
/// The hash covers the body only. Rendering the same fixture with the same
/// provenance always yields the same bytes.
pub fn render(id: &str, fixture: &Fixture, provenance: &Provenance) -> FixtureResult<RenderedFixture> {
    validate_id(id)?;
    let format = fixture.format();
    let hash = integrity_hash(fixture)?;

    let mut body = match canonical_value(fixture)? {
        Value::Object(map) => map,
        _ => return Err(FixtureError::NotAnObject(id.to_string())),
    };
    body.insert(
        INFO_KEY.to_string(),
        serde_json::to_value(provenance.info(hash.clone(), format))?,
    );

    let mut doc = Map::new();
    doc.insert(id.to_string(), Value::Object(body));
    let mut document = serde_json::to_vec_pretty(&sort_keys(Value::Object(doc)))?;
    document.push(b'\n');

    Ok(RenderedFixture {
        id: id.to_string(),
        format,
        hash,
        document,
    })
}

/// Writes fixtures under `<root>/<format>/<id>.json`, each exactly once
#[derive(Clone, Debug)]
pub struct FixtureWriter {
    root: PathBuf,
}

impl FixtureWriter {
    /// Writer rooted at `root`; directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FixtureWriter { root: root.into() }
    }

    /// Output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the fixture `id` of `format` is written
    pub fn path_for(&self, format: FixtureFormat, id: &str) -> PathBuf {
        self.root.join(format.as_str()).join(format!("{}.json", id))
    }

    /// Render and write. Fails with [`FixtureError::AlreadyExists`] if the
    /// file is already there, so two scenarios sharing an id cannot
    /// overwrite each other.
    pub fn write(
        &self,
        id: &str,
        fixture: &Fixture,
        provenance: &Provenance,
    ) -> FixtureResult<WrittenFixture> {
        let rendered = render(id, fixture, provenance)?;
        self.write_rendered(&rendered)
    }

    /// Write an already rendered document
    pub fn write_rendered(&self, rendered: &RenderedFixture) -> FixtureResult<WrittenFixture> {
        validate_id(&rendered.id)?;
        let dir = self.root.join(rendered.format.as_str());
        fs::create_dir_all(&dir).map_err(|e| FixtureError::io(&dir, e))?;

        let path = self.path_for(rendered.format, &rendered.id);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => FixtureError::AlreadyExists(path.clone()),
                _ => FixtureError::io(&path, e),
            })?;
        file.write_all(&rendered.document)
            .map_err(|e| FixtureError::io(&path, e))?;

        info!(
            id = %rendered.id,
            format = %rendered.format,
            hash = %rendered.hash,
            path = %path.display(),
            "fixture written"
        );
        Ok(WrittenFixture {
            id: rendered.id.clone(),
            path,
            hash: rendered.hash.clone(),
        })
    }
}

/// Recompute the hash of every fixture in a document and compare it with
/// the one recorded in its `_info`. Returns `(id, info)` per fixture.
pub fn verify_document(document: &[u8]) -> FixtureResult<Vec<(String, FixtureInfo)>> {
    let doc = match serde_json::from_slice::<Value>(document)? {
        Value::Object(map) => map,
        _ => return Err(FixtureError::NotAnObject("<document>".to_string())),
    };

    let mut verified = Vec::with_capacity(doc.len());
    for (id, entry) in doc {
        let mut body = match entry {
            Value::Object(map) => map,
            _ => return Err(FixtureError::NotAnObject(id)),
        };
        let info: FixtureInfo = match body.remove(INFO_KEY) {
            Some(raw) => {
                serde_json::from_value(raw).map_err(|_| FixtureError::MissingHash(id.clone()))?
            }
            None => return Err(FixtureError::MissingHash(id)),
        };
        let computed = integrity_hash(&Value::Object(body))?;
        if computed != info.hash {
            return Err(FixtureError::HashMismatch {
                id,
                recorded: info.hash,
                computed,
            });
        }
        debug!(%id, hash = %computed, "fixture hash verified");
        verified.push((id, info));
    }
    Ok(verified)
}

/// [`verify_document`] on a file
pub fn verify_file(path: impl AsRef<Path>) -> FixtureResult<Vec<(String, FixtureInfo)>> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|e| FixtureError::io(path, e))?;
    verify_document(&raw)
}
