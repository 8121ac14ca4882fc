//! Command line front end for WLD-FORGE
//!
//! Usage:
//!   wld-forge info map.wld                      # Counts, header strings, depth
//!   wld-forge new map.wld                       # Empty map
//!   wld-forge add-region map.wld 0,0 64,0 64,64 # Append a region
//!   wld-forge topology map.wld                  # Recompute depth and portals
//!   wld-forge export-dmap map.wld out.dmap      # Renderer export
//!   wld-forge textures walls.fpg --dump pngs/   # List (and extract) a package

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use wld_forge::world::{self, dmap, wld, MapDocument, Region};
use wld_forge::{Settings, TextureCatalog};

#[derive(Parser)]
#[command(name = "wld-forge", version)]
#[command(about = "Authoring tools for DIV sector and portal maps")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a WLD map
    Info { map: PathBuf },
    /// Write an empty WLD map
    New { output: PathBuf },
    /// Append a region drawn from "x,y" vertices
    AddRegion {
        map: PathBuf,
        /// At least three vertices, e.g. `0,0 256,0 256,256`
        #[arg(required = true, num_args = 3..)]
        vertices: Vec<String>,
        #[arg(long)]
        floor: Option<i32>,
        #[arg(long)]
        ceiling: Option<i32>,
        #[arg(long, default_value_t = 0)]
        floor_tex: u32,
        #[arg(long, default_value_t = 0)]
        ceil_tex: u32,
        #[arg(long, default_value_t = 0)]
        wall_tex: u32,
    },
    /// Recompute region depth and wall portals
    Topology {
        map: PathBuf,
        /// Write here instead of overwriting the input
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Export a map in the renderer's DMAP format
    ExportDmap {
        map: PathBuf,
        output: PathBuf,
        /// FPG or TEX package (defaults to the map's own, then settings)
        #[arg(long)]
        textures: Option<PathBuf>,
    },
    /// List the images in an FPG or TEX package
    Textures {
        package: PathBuf,
        /// Extract every image as PNG into this directory
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

fn setup_logging(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.settings.clone().or_else(Settings::default_path);
    let settings = Settings::load_or_default(settings_path.as_deref());
    setup_logging(&settings);
    tracing::debug!(version = wld_forge::VERSION, "starting");

    match cli.command {
        Commands::Info { map } => info(&map),
        Commands::New { output } => save(MapDocument::new(), &output, &settings),
        Commands::AddRegion {
            map,
            vertices,
            floor,
            ceiling,
            floor_tex,
            ceil_tex,
            wall_tex,
        } => {
            let vertices = vertices
                .iter()
                .map(|v| parse_vertex(v))
                .collect::<Result<Vec<_>>>()?;
            let mut document = load(&map)?;
            let region = Region::new(
                floor.unwrap_or(settings.default_floor_height),
                ceiling.unwrap_or(settings.default_ceiling_height),
            )
            .with_textures(floor_tex, ceil_tex, wall_tex);
            let index = document
                .add_textured_region(&vertices, region)
                .context("Failed to add region")?;
            println!("Added region {}", index);
            save(document, &map, &settings)
        }
        Commands::Topology { map, output } => {
            let mut document = load(&map)?;
            let report = world::assign_regions_and_portals(&mut document);
            println!("max depth {}, {} portals", report.max_depth, report.portals);
            let target = output.unwrap_or(map);
            write_wld(&document, &target)
        }
        Commands::ExportDmap { map, output, textures } => {
            let mut document = load(&map)?;
            let package = textures
                .or_else(|| package_from_metadata(&document, &map))
                .or_else(|| settings.texture_package.clone());
            match package {
                Some(package) => {
                    document
                        .textures_mut()
                        .load_package(&package)
                        .with_context(|| format!("Failed to load {}", package.display()))?;
                }
                None => tracing::warn!("no texture package, texture names will be blank"),
            }
            dmap::write(&document, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Exported {} regions, {} walls, {} texture slots",
                document.regions().len(),
                document.walls().len(),
                document.regions().len() * dmap::SLOTS_PER_REGION as usize
            );
            Ok(())
        }
        Commands::Textures { package, dump } => textures(&package, dump.as_deref()),
    }
}

fn parse_vertex(s: &str) -> Result<(i32, i32)> {
    let Some((x, y)) = s.split_once(',') else {
        bail!("Vertex '{}' is not in x,y form", s);
    };
    let x = x.trim().parse::<i32>().with_context(|| format!("Bad x in '{}'", s))?;
    let y = y.trim().parse::<i32>().with_context(|| format!("Bad y in '{}'", s))?;
    Ok((x, y))
}

fn load(path: &Path) -> Result<MapDocument> {
    wld::read(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn write_wld(document: &MapDocument, path: &Path) -> Result<()> {
    wld::write(document, path).with_context(|| format!("Failed to save {}", path.display()))
}

/// Save, refreshing topology first when the settings ask for it
fn save(mut document: MapDocument, path: &Path, settings: &Settings) -> Result<()> {
    if settings.assign_portals_on_save {
        world::assign_regions_and_portals(&mut document);
    }
    write_wld(&document, path)
}

/// The package named in the WLD header, resolved next to the map if relative
fn package_from_metadata(document: &MapDocument, map: &Path) -> Option<PathBuf> {
    let recorded = &document.metadata.package_path;
    if recorded.is_empty() {
        return None;
    }
    let path = PathBuf::from(recorded);
    if path.exists() {
        return Some(path);
    }
    let beside = map.parent()?.join(&document.metadata.package_name);
    beside.exists().then_some(beside)
}

fn info(path: &Path) -> Result<()> {
    let mut document = load(path)?;
    let meta = &document.metadata;
    println!("Map:      {} ({})", meta.map_name, meta.map_path);
    println!("Package:  {} ({})", meta.package_name, meta.package_path);
    println!("Points:   {}", document.points().len());
    println!(
        "Walls:    {} ({} portals)",
        document.walls().len(),
        document.walls().iter().filter(|w| w.is_portal()).count()
    );
    println!("Regions:  {}", document.regions().len());
    let max_depth = world::sort_regions_by_depth(&mut document);
    println!("Depth:    {}", max_depth);
    Ok(())
}

fn textures(package: &Path, dump: Option<&Path>) -> Result<()> {
    let mut catalog = TextureCatalog::new();
    catalog
        .load_package(package)
        .with_context(|| format!("Failed to load {}", package.display()))?;

    if let Some(dir) = dump {
        std::fs::create_dir_all(dir).context("Failed to create dump directory")?;
    }
    for entry in catalog.iter() {
        println!("{:5}  {:4}x{:<4}  {}", entry.id, entry.width(), entry.height(), entry.filename);
        if let Some(dir) = dump {
            let out = dir.join(format!("{:03}.png", entry.id));
            entry
                .pixels
                .save(&out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }
    }
    Ok(())
}
