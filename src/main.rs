use std::error::Error;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use terrain_builder::brush::{BrushMode, BrushOptions, SurfaceBrushOptions, TrackSlope};
use terrain_builder::config::TerrainConfig;
use terrain_builder::export;
use terrain_builder::file_store::FileStore;
use terrain_builder::manager::TerrainManager;
use terrain_builder::surface::SurfaceType;

#[derive(Parser, Debug)]
#[command(name = "terrain_builder")]
#[command(about = "Run a scripted terrain editing session against a save directory")]
struct Args {
    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long)]
    config: Option<String>,

    /// World units per chunk edge (overrides the config file)
    #[arg(long)]
    tile_size: Option<f32>,

    /// Grid samples per chunk edge (overrides the config file)
    #[arg(long)]
    resolution: Option<usize>,

    /// Chunks kept around the viewer in each direction (overrides the config file)
    #[arg(long)]
    view_distance: Option<u32>,

    /// Height clamp bound (overrides the config file)
    #[arg(long)]
    max_height: Option<f32>,

    /// Directory holding the saved records
    #[arg(short = 'd', long, default_value = "saves/terrain")]
    store_dir: String,

    /// World or map slot the records belong to
    #[arg(long, default_value = "slot1")]
    slot: String,

    /// Random seed for the strokes (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of brush strokes to apply
    #[arg(long, default_value = "8")]
    strokes: usize,

    /// Viewer X position
    #[arg(long, default_value = "0")]
    viewer_x: f32,

    /// Viewer Z position
    #[arg(long, default_value = "0")]
    viewer_z: f32,

    /// X coordinate of the height query printed at the end
    #[arg(long, default_value = "0")]
    query_x: f32,

    /// Z coordinate of the height query printed at the end
    #[arg(long, default_value = "0")]
    query_z: f32,

    /// Carve a graded track through the viewer position
    #[arg(long)]
    track: bool,

    /// Export the resident heights to PNG (e.g., "heights.png")
    #[arg(long)]
    export_heights: Option<String>,

    /// Export the resident surface tags to PNG (e.g., "surfaces.png")
    #[arg(long)]
    export_surfaces: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => TerrainConfig::from_json_file(path)?,
        None => TerrainConfig::default(),
    };
    if let Some(tile_size) = args.tile_size {
        config.tile_size = tile_size;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = resolution;
    }
    if let Some(view_distance) = args.view_distance {
        config.view_distance = view_distance;
    }
    if let Some(max_height) = args.max_height {
        config.max_height = max_height;
    }

    let seed = args.seed.unwrap_or_else(|| rand::random());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    log::info!("Editing slot '{}' in {} with seed {}", args.slot, args.store_dir, seed);

    let store = FileStore::new(&args.store_dir);
    let mut terrain = TerrainManager::new(config.clone(), store, args.slot.as_str())?;
    terrain.update_visible_chunks(args.viewer_x, args.viewer_z);

    // Strokes stay inside the resident window
    let reach = config.tile_size * (config.view_distance as f32 + 0.5);
    for stroke in 0..args.strokes {
        let mode = match rng.gen_range(0..4) {
            0 => BrushMode::Lower,
            1 => BrushMode::Smooth,
            2 => BrushMode::Flatten { target: rng.gen_range(-config.max_height..config.max_height) * 0.5 },
            _ => BrushMode::Raise,
        };
        let radius = rng.gen_range(0.05..0.5) * config.tile_size;
        let strength = match mode {
            BrushMode::Flatten { .. } => rng.gen_range(0.2..1.0),
            _ => rng.gen_range(0.5..3.0),
        };
        let brush = BrushOptions::new(mode, radius, strength);

        // A stroke is a short drag of dabs, flushed on release
        let mut x = args.viewer_x + rng.gen_range(-reach..reach);
        let mut z = args.viewer_z + rng.gen_range(-reach..reach);
        let dabs = rng.gen_range(3..12);
        let mut changed = 0;
        for _ in 0..dabs {
            if terrain.apply_brush(x, z, &brush) {
                changed += 1;
            }
            x += rng.gen_range(-0.25..0.25) * radius;
            z += rng.gen_range(-0.25..0.25) * radius;
        }

        let surface = SurfaceType::all()[rng.gen_range(0..SurfaceType::all().len())];
        terrain.apply_surface_brush(x, z, &SurfaceBrushOptions::new(surface, radius * 0.5, 0.8));

        let report = terrain.save_dirty_chunks();
        log::debug!(
            "Stroke {}: {:?} r={:.1} s={:.2}, {}/{} dabs changed terrain, {} chunk(s) saved",
            stroke, mode, radius, strength, changed, dabs, report.saved
        );
    }

    if args.track {
        let track = TrackSlope {
            center: (args.viewer_x, args.viewer_z),
            length: config.tile_size,
            width: config.tile_size * 0.08,
            rotation: rng.gen_range(0.0..std::f32::consts::TAU),
            slope_percent: rng.gen_range(-6.0..6.0),
            base_height: terrain.height_at(args.viewer_x, args.viewer_z),
            direction: None,
        };
        if terrain.apply_slope_for_track(&track) {
            log::info!("Carved track slope of {:.2}%", track.slope_percent);
        }
        terrain.save_dirty_chunks();
    }

    // Geometry refresh is the renderer's job; only report it here
    let updates = terrain.take_geometry_updates();
    log::debug!("{} chunk mesh(es) need rebuilding", updates.len());

    let height = terrain.height_at(args.query_x, args.query_z);
    println!("{}", terrain.stats().summary());
    println!("Height at ({:.1}, {:.1}): {:.3}", args.query_x, args.query_z, height);

    if let Some(path) = &args.export_heights {
        println!("Exporting heights to {}...", path);
        export::export_heights(terrain.chunks(), path)?;
    }
    if let Some(path) = &args.export_surfaces {
        println!("Exporting surfaces to {}...", path);
        export::export_surfaces(terrain.chunks(), path)?;
    }

    Ok(())
}
