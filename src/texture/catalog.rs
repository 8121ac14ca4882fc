//! Texture catalog - the document's owned set of loaded textures
//!
//! Entries keep their package order (which is what texture pickers show) and
//! are looked up by id, the number walls and regions store.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::RgbaImage;

use super::{fpg, tex};
use crate::codec::CodecError;
use crate::world::TextureId;

/// One decoded texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureEntry {
    pub filename: String,
    pub id: TextureId,
    pub pixels: RgbaImage,
}

impl TextureEntry {
    pub fn new(filename: impl Into<String>, id: TextureId, pixels: RgbaImage) -> Self {
        Self {
            filename: filename.into(),
            id,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Texture package formats the catalog can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Gzip-wrapped or plain F32 chunk stream
    Fpg,
    /// Uncompressed image table
    Tex,
}

impl PackageKind {
    /// Guess the package format from its leading bytes
    pub fn sniff(bytes: &[u8]) -> PackageKind {
        if bytes.len() >= 3 && &bytes[..3] == b"TEX" {
            PackageKind::Tex
        } else {
            PackageKind::Fpg
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureCatalog {
    entries: Vec<TextureEntry>,
    /// Id to position in `entries`
    by_id: HashMap<TextureId, usize>,
}

impl TextureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any entry with the same id in place
    pub fn add(&mut self, entry: TextureEntry) {
        match self.by_id.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.by_id.insert(entry.id, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureEntry> {
        self.by_id.get(&id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Filename of a texture, if the id is known
    pub fn filename_of(&self, id: TextureId) -> Option<&str> {
        self.get(id).map(|t| t.filename.as_str())
    }

    pub fn remove(&mut self, id: TextureId) -> Option<TextureEntry> {
        let pos = self.by_id.remove(&id)?;
        let entry = self.entries.remove(pos);
        for slot in self.by_id.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in package order
    pub fn iter(&self) -> impl Iterator<Item = &TextureEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
    }

    /// Decode a package held in memory and add its entries.
    ///
    /// `name` is used to label TEX images, which carry no filenames.
    pub fn load_package_bytes(&mut self, bytes: &[u8], name: &str) -> Result<usize, CodecError> {
        let entries = match PackageKind::sniff(bytes) {
            PackageKind::Tex => tex::decode(bytes, name)?,
            PackageKind::Fpg => fpg::decode(bytes)?,
        };
        let count = entries.len();
        for entry in entries {
            self.add(entry);
        }
        Ok(count)
    }

    /// Load an FPG or TEX package from disk and add its entries
    pub fn load_package<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, CodecError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let count = self.load_package_bytes(&bytes, &stem)?;
        tracing::info!(path = %path.display(), textures = count, "loaded texture package");
        Ok(count)
    }
}
