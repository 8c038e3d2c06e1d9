//! Command line front end for the asset codec

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};

use asset_codec::config::{CodecConfig, Config};
use asset_codec::foundation::logging;
use asset_codec::geometry::{weld, write_mesh_xml, ObjLoader, QuadPolicy, SignatureStrategy};
use asset_codec::report::ExportReport;
use asset_codec::script::{generate, MaterialGraph, Registry};

fn cli() -> Command {
    Command::new("codec_cli")
        .about("Parses, regenerates and converts material scripts and mesh geometry")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Codec configuration (.toml or .ron)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Build the registry from a script directory and report what it holds")
                .arg(
                    Arg::new("dir")
                        .value_name("DIR")
                        .help("Script directory; defaults to script_dir from the configuration"),
                ),
        )
        .subcommand(
            Command::new("material")
                .about("Regenerate a registered material")
                .arg(Arg::new("dir").value_name("DIR").required(true).help("Script directory"))
                .arg(Arg::new("name").value_name("NAME").required(true).help("Material name"))
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("mesh")
                .about("Convert an OBJ file to indexed geometry XML")
                .arg(Arg::new("obj").value_name("FILE").required(true).help("OBJ input"))
                .arg(output_arg())
                .arg(
                    Arg::new("weld")
                        .long("weld")
                        .value_name("STRATEGY")
                        .help("Weld signature strategy")
                        .value_parser(["position-aware", "attribute-only"]),
                )
                .arg(
                    Arg::new("quads")
                        .long("quads")
                        .value_name("POLICY")
                        .help("Quad handling")
                        .value_parser(["drop", "fan"]),
                ),
        )
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Write to a file instead of stdout")
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<String>("config") {
        Some(path) => CodecConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        None => CodecConfig::default(),
    };
    let level = match matches.get_count("verbose") {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    logging::init(level);
    config.validate().map_err(anyhow::Error::msg)?;

    let mut report = ExportReport::new();
    let result = match matches.subcommand() {
        Some(("scan", args)) => run_scan(args, &config, &mut report),
        Some(("material", args)) => run_material(args, &config, &mut report),
        Some(("mesh", args)) => run_mesh(args, &config),
        _ => bail!("No subcommand given"),
    };

    if !report.is_empty() {
        eprint!("{report}");
    }
    result
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a String> {
    args.get_one::<String>(id)
        .with_context(|| format!("Missing argument <{id}>"))
}

fn emit(args: &ArgMatches, text: &str) -> Result<()> {
    match args.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {path}"))?;
            log::info!("Wrote {path}");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn load_registry(dir: &Path, report: &mut ExportReport) -> Result<Registry> {
    Registry::load(dir, report).with_context(|| format!("Failed to scan {}", dir.display()))
}

fn run_scan(args: &ArgMatches, config: &CodecConfig, report: &mut ExportReport) -> Result<()> {
    let dir = match args.get_one::<String>("dir") {
        Some(dir) => PathBuf::from(dir),
        None => config
            .script_dir
            .clone()
            .context("No script directory given and none configured")?,
    };
    let registry = load_registry(&dir, report)?;

    println!("Scripts:          {}", registry.script_count());
    println!("Programs:         {}", registry.program_count());
    println!("Missing programs: {}", registry.missing().len());
    for name in registry.script_names() {
        println!("  material {name}");
    }
    for program in registry.missing() {
        println!("  missing  {} ({})", program.name, program.url.display());
    }
    Ok(())
}

fn run_material(args: &ArgMatches, config: &CodecConfig, report: &mut ExportReport) -> Result<()> {
    let dir = PathBuf::from(required(args, "dir")?);
    let name = required(args, "name")?;
    let registry = load_registry(&dir, report)?;

    let Some(script) = registry.script(name) else {
        bail!("Material '{name}' not found in {}", dir.display());
    };
    let graph = MaterialGraph::from_script(script);
    let text = generate(&graph, &registry, &config.generator_options(), report)
        .with_context(|| format!("Failed to generate material '{name}'"))?;
    emit(args, &text)
}

fn run_mesh(args: &ArgMatches, config: &CodecConfig) -> Result<()> {
    let path = required(args, "obj")?;
    let mut options = config.weld_options();
    match args.get_one::<String>("weld").map(String::as_str) {
        Some("attribute-only") => options.strategy = SignatureStrategy::AttributeOnly,
        Some("position-aware") => options.strategy = SignatureStrategy::PositionAware,
        _ => {}
    }
    match args.get_one::<String>("quads").map(String::as_str) {
        Some("fan") => options.quads = QuadPolicy::Fan,
        Some("drop") => options.quads = QuadPolicy::DropFourthCorner,
        _ => {}
    }

    let soup = ObjLoader::load(path).with_context(|| format!("Failed to load {path}"))?;
    let mesh = weld(&soup, &options).with_context(|| format!("Failed to weld {path}"))?;
    log::info!(
        "{path}: {} vertices, {} triangles in {} submesh(es)",
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.submeshes.len()
    );
    emit(args, &write_mesh_xml(&mesh)?)
}
