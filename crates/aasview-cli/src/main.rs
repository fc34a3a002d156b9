//! Command-line inspector for EAAS area awareness files

mod logger;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use aasview_common::aasfiles::{LumpType, MAX_STEP_HEIGHT};
use aasview_common::aasload::PARALLEL_LUMP_THRESHOLD;
use aasview_common::aaspoly::face_vertices;
use aasview_common::{analyze_with, AasFile, AnalysisConfig, ReachKind, ReachabilityInfo};

/// Inspect the navigation data of an EAAS file
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,

    /// More log output (repeatable)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[clap(short, long, global = true)]
    quiet: bool,

    /// Largest drop still treated as a step
    #[clap(long, default_value_t = MAX_STEP_HEIGHT, global = true)]
    step_height: f32,

    /// Lumps with at least this many records are decoded in parallel
    #[clap(long, default_value_t = PARALLEL_LUMP_THRESHOLD, global = true)]
    parallel_threshold: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print lump sizes and classification counts
    Info {
        #[clap(value_parser)]
        file: PathBuf,
    },

    /// List directed area links
    Reach {
        #[clap(value_parser)]
        file: PathBuf,

        #[clap(long, value_enum, default_value_t = KindArg::All)]
        kind: KindArg,
    },

    /// Print the ordered vertex loop of a face (negative id = flipped)
    Face {
        #[clap(value_parser)]
        file: PathBuf,

        #[clap(allow_negative_numbers = true)]
        face: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Walk,
    Fall,
    Step,
    All,
}

impl KindArg {
    fn kinds(self) -> &'static [ReachKind] {
        match self {
            KindArg::Walk => &[ReachKind::Walk],
            KindArg::Fall => &[ReachKind::Fall],
            KindArg::Step => &[ReachKind::Step],
            KindArg::All => &ReachKind::ALL,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_logger(logger::level_from_flags(args.verbose, args.quiet));

    let session = Session {
        parallel_threshold: args.parallel_threshold,
        config: AnalysisConfig {
            step_height: args.step_height,
        },
    };

    match args.command {
        Commands::Info { file } => print_info(&file, &session),
        Commands::Reach { file, kind } => print_reach(&file, &session, kind),
        Commands::Face { file, face } => print_face(&file, &session, face),
    }
}

/// Decoder and analyzer settings taken from the global flags.
struct Session {
    parallel_threshold: usize,
    config: AnalysisConfig,
}

fn load(path: &Path, session: &Session) -> Result<AasFile> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Loaded {} ({} bytes)", path.display(), data.len());
    AasFile::parse_with(&data, session.parallel_threshold)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn load_and_analyze(path: &Path, session: &Session) -> Result<(AasFile, ReachabilityInfo)> {
    let file = load(path, session)?;
    let info = analyze_with(&file, &session.config);
    Ok((file, info))
}

fn print_info(path: &Path, session: &Session) -> Result<()> {
    let (file, info) = load_and_analyze(path, session)?;

    println!("{}: version {}, bsp checksum {:#010x}", path.display(), file.header.version, file.header.bspchecksum);
    for ty in LumpType::ALL {
        let lump = file.header.lump(ty);
        println!(
            "  {:<14} {:>8} bytes at {:>8} ({} records)",
            ty.name(),
            lump.filelen,
            lump.fileofs,
            lump.filelen as usize / ty.record_size()
        );
    }
    println!("clusters:            {}", info.cluster_count);
    println!("ground faces:        {}", info.ground_face_ids.len());
    println!("do-not-enter faces:  {}", info.do_not_enter_face_ids.len());
    println!("portal faces:        {}", info.portal_face_ids.len());
    println!("liquid areas:        {}", info.liquid_areas.len());
    println!(
        "liquid faces:        {} water, {} slime, {} lava",
        info.water_face_ids.len(),
        info.slime_face_ids.len(),
        info.lava_face_ids.len()
    );
    println!(
        "cluster portals:     {} faces ({} walkable)",
        info.cluster_portal_face_ids.len(),
        info.walkable_cluster_portal_face_ids.len()
    );
    for kind in ReachKind::ALL {
        println!("{:<21}{}", format!("{} links:", kind.name()), info.links(kind).len());
    }
    Ok(())
}

fn print_reach(path: &Path, session: &Session, kind: KindArg) -> Result<()> {
    let (_, info) = load_and_analyze(path, session)?;
    for &kind in kind.kinds() {
        for link in info.links(kind) {
            println!(
                "{} {} -> {} via face {}",
                kind.name(),
                link.front_area,
                link.back_area,
                link.face_num
            );
        }
    }
    Ok(())
}

fn print_face(path: &Path, session: &Session, face: i32) -> Result<()> {
    let file = load(path, session)?;
    let vertices = face_vertices(&file, face).with_context(|| format!("Face {}", face))?;
    for v in vertices {
        println!("{} {} {}", v[0], v[1], v[2]);
    }
    Ok(())
}
