//! Texture packages for the map editor
//!
//! ## Overview
//!
//! - **TextureEntry**: one decoded RGBA image with its package id and filename
//! - **TextureCatalog**: the document-owned, id-keyed set of entries
//!
//! ## Package formats
//!
//! - **FPG**: 32-bit chunk stream, optionally gzip-wrapped, pixels stored BGRA
//! - **TEX**: uncompressed table of RGB24/RGBA32 images
//!
//! Both readers skip individual broken images and keep whatever was parsed
//! before a truncated tail; only header failures abort a load.

mod catalog;
pub mod fpg;
pub mod tex;

pub use catalog::{PackageKind, TextureCatalog, TextureEntry};
