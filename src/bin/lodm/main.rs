//! lodm CLI - Tool for inspecting, verifying and rewriting LODM archives.

use std::env;
use std::path::Path;
use std::time::Instant;

use lodm::export;
use lodm::{Archive, CompressSetting, OpenOptions, SignatureFlags};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity level
#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

fn init_logging(verbosity: Verbosity) {
    // RUST_LOG wins over the command line flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = Verbosity::Info;
    let mut opts = OpenOptions::default();
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Debug,
            "-vv" | "--trace" => verbosity = Verbosity::Trace,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            "--no-mmap" => opts.use_mmap = false,
            _ => filtered_args.push(arg),
        }
    }
    init_logging(verbosity);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => {
            let json = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            let file = filtered_args[1..].iter().find(|s| !s.starts_with('-'));
            match file {
                Some(file) => cmd_info(file, opts, json),
                None => usage("lodm info <file.lodm> [--json]"),
            }
        }

        "roots" | "r" => match filtered_args.get(1) {
            Some(file) => cmd_roots(file, opts),
            None => usage("lodm roots <file.lodm>"),
        },

        "verify" | "check" => {
            let parallel = filtered_args.iter().any(|&s| s == "--parallel" || s == "-p");
            let file = filtered_args[1..].iter().find(|s| !s.starts_with('-'));
            match file {
                Some(file) => cmd_verify(file, opts, parallel),
                None => usage("lodm verify <file.lodm> [--parallel]"),
            }
        }

        "extract" | "x" => {
            if filtered_args.len() < 3 {
                usage("lodm extract <file.lodm> <dir>")
            } else {
                cmd_extract(filtered_args[1], filtered_args[2], opts)
            }
        }

        "repack" | "p" => {
            if filtered_args.len() < 3 {
                usage("lodm repack <in.lodm> <out.lodm> [--codec raw|grid|packed] [--texture jpg|png] [--setting file.json]")
            } else {
                match RepackArgs::parse(&filtered_args[3..]) {
                    Ok(repack) => cmd_repack(filtered_args[1], filtered_args[2], opts, repack),
                    Err(msg) => {
                        eprintln!("Error: {msg}");
                        std::process::exit(1);
                    }
                }
            }
        }

        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        "version" | "--version" | "-V" => {
            print_version();
            Ok(())
        }

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other, opts, false)
            } else {
                eprintln!("Unknown command: {}", other);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn usage(line: &str) -> lodm::Result<()> {
    eprintln!("Error: missing arguments");
    eprintln!("Usage: {line}");
    std::process::exit(1);
}

fn print_version() {
    println!(
        "lodm {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("LODM_BUILD_STAMP")
    );
}

fn print_help() {
    print_version();
    println!();
    println!("USAGE:");
    println!("    lodm [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file> [--json]       Show header, table counts and codecs");
    println!("    r, roots   <file>                List LOD-independent root nodes");
    println!("    verify     <file> [--parallel]   Decode every block and report totals");
    println!("    x, extract <file> <dir>          Write OBJ/MTL and texture files");
    println!("    p, repack  <in> <out> [FLAGS]    Re-encode an archive");
    println!("    h, help                          Show this help");
    println!();
    println!("REPACK FLAGS:");
    println!("    --codec raw|grid|packed    Geometry codec (default: keep)");
    println!("    --texture jpg|png          Texture codec (default: keep)");
    println!("    --setting <file.json>      Compression setting");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    --no-mmap        Read through a buffered stream instead of mapping");
    println!();
    println!("EXAMPLES:");
    println!("    lodm info model.lodm");
    println!("    lodm verify --parallel model.lodm");
    println!("    lodm extract model.lodm out/");
    println!("    lodm repack model.lodm small.lodm --codec packed --texture jpg");
    println!();
    println!("NOTES:");
    println!("    - Passing a file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn open(path: &str, opts: OpenOptions) -> lodm::Result<Archive> {
    info!("Opening archive: {}", path);
    let archive = Archive::open_opts(path, opts)?;
    debug!(mapped = archive.source().is_some_and(|s| s.is_mapped()), "archive opened");
    Ok(archive)
}

fn flag_names(flags: SignatureFlags) -> String {
    let names: Vec<&str> = flags.iter_names().map(|(name, _)| name).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(" | ")
    }
}

fn cmd_info(path: &str, opts: OpenOptions, json: bool) -> lodm::Result<()> {
    let archive = open(path, opts)?;
    let h = archive.header();
    let sig = archive.signature();
    let texture = sig.texture_format()?.map(|f| f.extension()).unwrap_or("-");

    if json {
        let value = serde_json::json!({
            "path": path,
            "version": h.version,
            "nvert": h.nvert,
            "nface": h.nface,
            "flags": sig.flags.bits(),
            "codec": archive.codec().name(),
            "texture": texture,
            "normals": sig.has_normals(),
            "colors": sig.has_colors(),
            "texcoords": sig.has_texcoords(),
            "nodes": archive.node_count(),
            "instance_nodes": archive.instance_node_count(),
            "instances": archive.instances().len(),
            "patches": archive.patches().len(),
            "textures": archive.texture_count(),
            "materials": archive.materials().len(),
            "features": archive.feature_count(),
            "roots": archive.nroots(),
            "sphere": h.sphere.to_array(),
            "tile": sig.is_tile().then_some(h.tile),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Archive: {}", path);
    println!("Version: {}", h.version);
    println!("Flags:   {}", flag_names(sig.flags));
    println!("Codec:   {} geometry, {} textures", archive.codec().name(), texture);
    println!(
        "Vertex:  normals={} colors={} texcoords={}",
        sig.has_normals(),
        sig.has_colors(),
        sig.has_texcoords()
    );
    println!();
    println!("Tables:");
    println!("  Nodes:          {} ({} roots)", archive.node_count(), archive.nroots());
    println!("  Instance nodes: {} ({} placements)", archive.instance_node_count(), archive.instances().len());
    println!("  Patches:        {}", archive.patches().len());
    println!("  Textures:       {}", archive.texture_count());
    println!("  Materials:      {}", archive.materials().len());
    println!("  Features:       {}", archive.feature_count());
    println!();
    println!("Geometry: {} vertices, {} faces", h.nvert, h.nface);
    let s = h.sphere;
    println!(
        "Sphere:   center ({:.3}, {:.3}, {:.3}) radius {:.3}",
        s.center.x, s.center.y, s.center.z, s.radius
    );
    if sig.is_tile() {
        println!("Tile:     {:?}", h.tile);
    }
    if let Some(source) = archive.source() {
        println!("Size:     {} bytes", source.size());
    }
    Ok(())
}

fn cmd_roots(path: &str, opts: OpenOptions) -> lodm::Result<()> {
    let archive = open(path, opts)?;
    println!("{} root nodes of {}", archive.nroots(), archive.node_count());
    for n in 0..archive.nroots() {
        let node = archive.node(n)?;
        let patches = archive.node_patch_range(n)?;
        println!(
            "  [{}] verts={} faces={} error={:.4} radius={:.3} patches={}..{}",
            n,
            node.nvert,
            node.nface,
            node.error,
            node.sphere.radius,
            patches.start,
            patches.end
        );
    }
    Ok(())
}

fn cmd_verify(path: &str, opts: OpenOptions, parallel: bool) -> lodm::Result<()> {
    let mut archive = open(path, opts)?;
    let start = Instant::now();
    if parallel {
        archive.load_all_parallel()?;
    } else {
        archive.load_all()?;
    }
    for t in 0..archive.texture_count() {
        archive.load_texture(t)?;
    }
    let elapsed = start.elapsed();

    let mut nvert = 0usize;
    let mut nface = 0usize;
    for n in 0..archive.node_count() {
        if let Some(mesh) = archive.node_mesh(n) {
            nvert += mesh.nvert();
            nface += mesh.nface();
        }
    }
    for n in 0..archive.instance_node_count() {
        if let Some(inst) = archive.instance_mesh(n) {
            nvert += inst.mesh.nvert();
            nface += inst.mesh.nface();
        }
    }
    let feature_bytes: usize = (0..archive.feature_count())
        .filter_map(|f| archive.feature_data(f))
        .map(<[u8]>::len)
        .sum();

    println!("OK: {}", path);
    println!(
        "  {} nodes, {} instance nodes, {} textures decoded in {:.2?}",
        archive.node_count(),
        archive.instance_node_count(),
        archive.texture_count(),
        elapsed
    );
    println!("  {} vertices, {} faces, {} feature bytes", nvert, nface, feature_bytes);
    Ok(())
}

fn cmd_extract(path: &str, dir: &str, opts: OpenOptions) -> lodm::Result<()> {
    let mut archive = open(path, opts)?;
    archive.load_everything()?;
    let stats = export::extract(&archive, dir)?;
    println!(
        "Extracted {} nodes, {} instance nodes, {} textures to {}",
        stats.nodes, stats.instances, stats.textures, dir
    );
    Ok(())
}

/// Options of the `repack` command.
#[derive(Default)]
struct RepackArgs {
    geometry: Option<SignatureFlags>,
    texture: Option<SignatureFlags>,
    setting: Option<String>,
}

impl RepackArgs {
    fn parse(args: &[&str]) -> Result<Self, String> {
        let mut out = Self::default();
        let mut iter = args.iter();
        while let Some(&arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .copied()
                    .ok_or_else(|| format!("{arg} needs a value"))
            };
            match arg {
                "--codec" => {
                    out.geometry = Some(match value()? {
                        "raw" => SignatureFlags::empty(),
                        "grid" => SignatureFlags::CORTO,
                        "packed" => SignatureFlags::DRACO,
                        other => return Err(format!("unknown codec '{other}'")),
                    })
                }
                "--texture" => {
                    out.texture = Some(match value()? {
                        "jpg" | "jpeg" => SignatureFlags::PTJPG,
                        "png" => SignatureFlags::PTPNG,
                        other => return Err(format!("unknown texture format '{other}'")),
                    })
                }
                "--setting" => out.setting = Some(value()?.to_string()),
                other => return Err(format!("unknown repack flag '{other}'")),
            }
        }
        Ok(out)
    }
}

fn cmd_repack(input: &str, output: &str, opts: OpenOptions, args: RepackArgs) -> lodm::Result<()> {
    let mut archive = open(input, opts)?;
    let start = Instant::now();
    archive.detach()?;
    debug!(elapsed = ?start.elapsed(), "loaded all payloads");

    let flags = archive.signature().flags;
    let geometry = args
        .geometry
        .unwrap_or(flags & (SignatureFlags::CORTO | SignatureFlags::DRACO));
    let texture = args
        .texture
        .unwrap_or(flags & (SignatureFlags::PTJPG | SignatureFlags::PTPNG));
    archive.set_codec_flags(geometry, texture)?;
    if let Some(setting) = &args.setting {
        archive.set_setting(CompressSetting::from_json_file(setting)?);
    }

    archive.save(output)?;
    let before = std::fs::metadata(input)?.len();
    let after = std::fs::metadata(output)?.len();
    println!(
        "Repacked {} -> {} ({} codec): {} -> {} bytes in {:.2?}",
        input,
        output,
        archive.codec().name(),
        before,
        after,
        start.elapsed()
    );
    Ok(())
}
