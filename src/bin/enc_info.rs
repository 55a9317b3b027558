// ENC / Raster Inspection Tool
// Prints cell metadata, exports features as GeoJSON and decodes raster tiles

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use vortexnav_charts::enc::geojson::features_to_geojson;
use vortexnav_charts::enc::DrawPriorities;
use vortexnav_charts::raster::{RasterTile, TileManifest};
use vortexnav_charts::{EncDataset, EngineConfig, GeoRect, SampleMatrix, TileCatalog};

#[derive(Parser)]
#[command(name = "enc_info")]
#[command(about = "Inspect S-57 ENC cells and JPEG-LS raster tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print cell metadata, bounds and zoom range
    Info {
        /// ENC cell (.000)
        file: PathBuf,
    },
    /// Load a cell and report or export its features
    Features {
        /// ENC cell (.000)
        file: PathBuf,
        /// Query rectangle "min_lon,min_lat,max_lon,max_lat" (default: cell bounds)
        #[arg(short, long)]
        bbox: Option<GeoRect>,
        /// Write the features as GeoJSON
        #[arg(short, long)]
        geojson: Option<PathBuf>,
        /// Engine configuration with priority overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Decode every tile of a raster manifest
    Tiles {
        /// Tile manifest (JSON)
        manifest: PathBuf,
        /// Write each decoded tile as a 16-bit grayscale PNG
        #[arg(short, long)]
        png_dir: Option<PathBuf>,
        /// Engine configuration with the default predictor
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => print_info(&file)?,
        Commands::Features {
            file,
            bbox,
            geojson,
            config,
        } => export_features(&file, bbox, geojson.as_deref(), config.as_deref())?,
        Commands::Tiles {
            manifest,
            png_dir,
            config,
        } => decode_tiles(&manifest, png_dir.as_deref(), config.as_deref())?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    })
}

fn print_info(file: &Path) -> Result<(), Box<dyn Error>> {
    let dataset = EncDataset::open(file)?;
    let info = dataset.info();
    let bounds = dataset.bounds();
    let zooms = dataset.zooms();

    println!("Cell:        {}", info.name);
    println!("Edition:     {}", info.edition);
    println!("Update:      {}", info.update);
    match info.issue_date {
        Some(date) => println!("Issued:      {}", date),
        None => println!("Issued:      unknown"),
    }
    if let Some(usage) = info.intended_usage {
        println!("Usage band:  {}", usage);
    }
    println!("COMF:        {}", info.comf);
    println!(
        "Bounds:      {:.6},{:.6} .. {:.6},{:.6}",
        bounds.min_lon, bounds.min_lat, bounds.max_lon, bounds.max_lat
    );
    println!("Zooms:       {}-{}", zooms.start(), zooms.end());
    Ok(())
}

fn export_features(
    file: &Path,
    bbox: Option<GeoRect>,
    geojson: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    let priorities = Arc::new(DrawPriorities::from_config(&config)?);
    let dataset = EncDataset::open_with_priorities(file, priorities)?;
    let report = dataset.load()?;

    println!(
        "{}: {} points, {} lines, {} areas",
        dataset.info().name,
        report.points,
        report.lines,
        report.polygons
    );
    if report.skipped_records > 0 {
        println!("Skipped {} invalid vector records", report.skipped_records);
    }
    for dropped in &report.dropped {
        println!(
            "Dropped {} feature {} (class {}): {}",
            dropped.primitive, dropped.rcid, dropped.objl, dropped.reason
        );
    }

    let rect = bbox.unwrap_or_else(|| dataset.bounds());
    let points = dataset.points(&rect)?;
    let lines = dataset.lines(&rect)?;
    let polygons = dataset.polygons(&rect)?;
    println!(
        "In view: {} points, {} lines, {} areas",
        points.len(),
        lines.len(),
        polygons.len()
    );

    if let Some(path) = geojson {
        let collection = features_to_geojson(&points, &lines, &polygons);
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &collection)?;
        println!("Wrote {} features to {}", collection.features.len(), path.display());
    }
    Ok(())
}

fn decode_tiles(
    manifest: &Path,
    png_dir: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = load_config(config)?;
    let manifest = TileManifest::from_file(manifest)?;
    let tiles: Vec<Arc<RasterTile>> = manifest
        .tiles(config.default_predictor)
        .into_iter()
        .map(Arc::new)
        .collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let results = runtime.block_on(TileCatalog::decode_all(&tiles));

    if let Some(dir) = png_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut failed = 0;
    for (tile, result) in tiles.iter().zip(results) {
        match result {
            Ok(image) => {
                match image.range() {
                    Some((min, max)) => println!(
                        "{}: {}x{} samples {}..{}",
                        tile.name,
                        image.width(),
                        image.height(),
                        min,
                        max
                    ),
                    None => println!("{}: empty", tile.name),
                }
                if let Some(dir) = png_dir {
                    write_png(&dir.join(format!("{}.png", tile.name)), &image)?;
                }
            }
            Err(e) => {
                failed += 1;
                println!("{}: FAILED ({})", tile.name, e);
            }
        }
    }

    println!("Decoded {} of {} tiles", tiles.len() - failed, tiles.len());
    Ok(())
}

/// 16-bit grayscale PNG, samples stored big-endian
fn write_png(path: &Path, image: &SampleMatrix) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(writer, image.width() as u32, image.height() as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Sixteen);
    encoder.set_compression(png::Compression::Fast);

    let bytes: Vec<u8> = image
        .as_slice()
        .iter()
        .flat_map(|sample| sample.to_be_bytes())
        .collect();
    encoder.write_header()?.write_image_data(&bytes)?;
    Ok(())
}
