//! CLI utility for link point analysis

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use navlink::{AnalysisConfig, ConnectionInfo, HaltonTable, LinkAnalysis, TaggedMeshHost};
use navlink_common::{Aabb, TriMesh};

/// Margin added around the mesh bounds when no sampling volume is given
const DEFAULT_BOUNDS_MARGIN: f32 = 1.0;

/// A CLI utility for finding link points between traversal classes
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an area-tagged mesh and report link endpoint pairs
    Analyze {
        /// Input mesh file (OBJ format, groups name the area classes)
        #[clap(long, value_parser)]
        input: PathBuf,

        /// Minimum corner of the sampling volume (x,y,z)
        #[clap(long, value_parser = parse_vector, requires = "bounds_max")]
        bounds_min: Option<Vec3>,

        /// Maximum corner of the sampling volume (x,y,z)
        #[clap(long, value_parser = parse_vector, requires = "bounds_min")]
        bounds_max: Option<Vec3>,

        /// Point table file; a default table is generated when omitted
        #[clap(long, value_parser)]
        table: Option<PathBuf>,

        /// Maximum slope in degrees of triangles that are sampled
        #[clap(long, default_value = "30.0")]
        max_slope_angle: f32,

        /// Grid cell extents (x,y,z)
        #[clap(long, value_parser = parse_vector, default_value = "0.5,2.0,0.5")]
        cell_size: Vec3,

        /// Surface area covered by one sample
        #[clap(long, default_value = "2.0")]
        area_per_sample: f32,

        /// Source mesh layers to sample; the input mesh is on layer 0
        #[clap(long, default_value_t = u32::MAX)]
        layer_mask: u32,

        /// Search radius when snapping samples onto the bridging area
        #[clap(long, default_value = "0.3")]
        surface_snap_radius: f32,

        /// Area class used for sampling and reachability
        #[clap(long, default_value = "BakeLink")]
        bridge_area: String,

        /// First traversal class
        #[clap(long, default_value = "Jump")]
        class_one: String,

        /// Second traversal class
        #[clap(long, default_value = "Walkable")]
        class_two: String,

        /// Output file for the link pairs (.json writes JSON)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Generate a low-discrepancy point table
    GenTable {
        /// Output table file (.json writes JSON, anything else binary)
        #[clap(long, value_parser)]
        output: PathBuf,

        /// Number of points in the table
        #[clap(long, default_value = "3000")]
        length: usize,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 3 {
        return Err(format!(
            "Vector must have 3 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let z = parts[2].trim().parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec3::new(x, y, z))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Commands::Analyze {
            input,
            bounds_min,
            bounds_max,
            table,
            max_slope_angle,
            cell_size,
            area_per_sample,
            layer_mask,
            surface_snap_radius,
            bridge_area,
            class_one,
            class_two,
            output,
        } => {
            let bounds = match (bounds_min, bounds_max) {
                (Some(min), Some(max)) => Some(Aabb::new(min, max)),
                _ => None,
            };
            let config = AnalysisConfig {
                max_slope_angle,
                cell_size,
                area_per_sample,
                layer_mask,
                surface_snap_radius,
                bridge_area,
                class_one_area: class_one,
                class_two_area: class_two,
                ..Default::default()
            };
            analyze(&input, bounds, config, table.as_deref(), output.as_deref())
        }
        Commands::GenTable { output, length } => gen_table(&output, length),
    }
}

/// Load a point table, picking the format from the file extension
fn load_table(path: &Path) -> Result<HaltonTable> {
    let table = if is_json(path) {
        HaltonTable::load_from_json(path)
    } else {
        HaltonTable::load_from_binary(path)
    };
    table.with_context(|| format!("Failed to load point table: {}", path.display()))
}

/// Run the analysis on an OBJ mesh
fn analyze(
    input: &Path,
    bounds: Option<Aabb>,
    mut config: AnalysisConfig,
    table_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    println!("Loading mesh from {}...", input.display());

    let mesh = TriMesh::from_obj(input).map_err(|e| anyhow!("Failed to load mesh: {}", e))?;

    println!(
        "Mesh loaded: {} vertices, {} triangles, areas {:?}",
        mesh.vert_count, mesh.tri_count, mesh.group_names
    );

    config.bounds = match bounds {
        Some(bounds) => bounds,
        None => mesh.calculate_bounds().expanded(DEFAULT_BOUNDS_MARGIN),
    };
    println!(
        "Sampling volume: min={:?}, max={:?}",
        config.bounds.min, config.bounds.max
    );

    let table = match table_path {
        Some(path) => load_table(path)?,
        None => HaltonTable::default(),
    };
    log::debug!("using point table with {} points", table.len());

    let host = TaggedMeshHost::from_tri_mesh(&mesh, 0)
        .map_err(|e| anyhow!("Failed to build host from mesh: {}", e))?;

    let analysis = LinkAnalysis::new(config, &table);
    let run = analysis
        .run(&host, &host)
        .map_err(|e| anyhow!("Analysis failed: {}", e))?;

    let stats = &run.context.stats;
    println!(
        "Found {} regions ({} qualifying) from {} samples",
        run.regions.len(),
        stats.qualifying_regions,
        stats.samples
    );

    let info = run.connection_info();
    match output {
        Some(path) => write_links(path, &info)?,
        None => {
            println!("Links:");
            for (i, (one, two)) in info.pairs().enumerate() {
                println!(
                    "{}: {},{},{} -> {},{},{}",
                    i, one.x, one.y, one.z, two.x, two.y, two.z
                );
            }
        }
    }

    Ok(())
}

/// Save link pairs as text or JSON
fn write_links(path: &Path, info: &ConnectionInfo) -> Result<()> {
    println!("Saving {} links to {}...", info.len(), path.display());

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    if is_json(path) {
        serde_json::to_writer_pretty(&mut writer, info).context("Failed to write JSON")?;
        writeln!(writer)?;
    } else {
        writeln!(writer, "# {} links", info.len())?;
        writeln!(writer, "# class one x,y,z;class two x,y,z")?;
        for (one, two) in info.pairs() {
            writeln!(
                writer,
                "{},{},{};{},{},{}",
                one.x, one.y, one.z, two.x, two.y, two.z
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Generate and save a point table
fn gen_table(output: &Path, length: usize) -> Result<()> {
    println!("Generating point table with {} points...", length);

    let table = HaltonTable::generate(length).map_err(|e| anyhow!("{}", e))?;

    let saved = if is_json(output) {
        table.save_to_json(output)
    } else {
        table.save_to_binary(output)
    };
    saved.with_context(|| format!("Failed to save point table: {}", output.display()))?;

    println!("Saved point table to {}", output.display());
    Ok(())
}
