//! WLD-FORGE: level authoring core for DIV-style sector and portal maps
//!
//! The interactive editor lives elsewhere; this crate is the part with rules:
//! - Binary codecs for the legacy formats (WLD maps, FPG/TEX texture
//!   packages, DMAP renderer export)
//! - Topology inference that turns raw points and walls into nested regions
//!   joined by portals

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod codec;
pub mod settings;
pub mod texture;
pub mod world;

pub use codec::CodecError;
pub use settings::Settings;
pub use texture::{TextureCatalog, TextureEntry};
pub use world::{MapDocument, Point, Region, Wall, WallType};
