//! usdcoll - Inspect collections in JSON scene files.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use usd_collections::collection::{CollectionApi, CollectionData, FilteredStringList};
use usd_collections::core::{SceneHierarchy, Stage};
use usd_collections::host::{CollectionContext, ConsoleReporter, Settings};
use usd_collections::ScenePath;

/// Verbosity from -q / -v / -vv
#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Debug,
    Trace,
}

struct Options {
    verbosity: Verbosity,
    settings: Option<PathBuf>,
    args: Vec<String>,
}

fn parse_options(raw: &[String]) -> anyhow::Result<Options> {
    let mut options = Options {
        verbosity: Verbosity::Normal,
        settings: None,
        args: Vec::new(),
    };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => options.verbosity = Verbosity::Debug,
            "-vv" | "--trace" => options.verbosity = Verbosity::Trace,
            "-q" | "--quiet" => options.verbosity = Verbosity::Quiet,
            "--settings" => {
                let path = iter.next().context("--settings needs a file argument")?;
                options.settings = Some(PathBuf::from(path));
            }
            _ => options.args.push(arg.clone()),
        }
    }
    Ok(options)
}

fn init_logging(verbosity: Verbosity, settings: &Settings) {
    let default = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => settings.log_filter.as_str(),
        Verbosity::Debug => "debug",
        Verbosity::Trace => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().skip(1).collect();
    let options = match parse_options(&raw) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings = match &options.settings {
        Some(path) => match Settings::load_from(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to load settings {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::load(),
    };
    init_logging(options.verbosity, &settings);

    let args: Vec<&str> = options.args.iter().map(String::as_str).collect();
    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match args[0] {
        "tree" | "t" => with_scene(&args, "tree <scene.json>", cmd_tree),
        "list" | "l" => with_scene(&args, "list <scene.json>", |stage| cmd_list(stage, &settings)),
        "print" | "p" => cmd_print(&args[1..], settings),
        "check" | "c" => with_scene(&args, "check <scene.json>", |stage| cmd_check(stage, &settings)),
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        "version" | "--version" => {
            println!(
                "usdcoll {} (built {})",
                env!("CARGO_PKG_VERSION"),
                env!("USDCOLL_BUILD_DATE")
            );
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("usdcoll - collection membership inspector");
    println!();
    println!("USAGE:");
    println!("    usdcoll [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    t, tree   <scene>                          Show prim hierarchy and collections");
    println!("    l, list   <scene>                          List collections with strategy and conflicts");
    println!("    p, print  <scene> <prim> <name> [--filter TEXT]");
    println!("                                             Print collection members");
    println!("    c, check  <scene>                          Validate every membership expression");
    println!("    h, help                                    Show this help");
    println!("    version                                  Show version");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Errors only");
    println!("    --settings <FILE>    Load settings from FILE instead of the config dir");
    println!();
    println!("EXAMPLES:");
    println!("    usdcoll tree shot.json");
    println!("    usdcoll print shot.json /World lights --filter key*");
    println!("    RUST_LOG=usd_collections=trace usdcoll check shot.json");
}

fn with_scene<F>(args: &[&str], usage: &str, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&Arc<Stage>) -> anyhow::Result<()>,
{
    let Some(path) = args.get(1) else {
        bail!("missing scene argument\nUsage: usdcoll {}", usage);
    };
    let stage = open_stage(path)?;
    f(&stage)
}

fn open_stage(path: &str) -> anyhow::Result<Arc<Stage>> {
    debug!(path, "opening scene");
    Stage::open(path).with_context(|| format!("failed to open {}", path))
}

/// Every (prim, collection name) pair, pre-order.
fn all_collections(stage: &Stage) -> Vec<(ScenePath, String)> {
    let mut out = Vec::new();
    for prim in stage.traverse_all() {
        for name in CollectionApi::collection_names(stage, &prim) {
            out.push((prim.clone(), name));
        }
    }
    out
}

fn context(settings: &Settings) -> CollectionContext {
    CollectionContext::new(settings.clone(), Arc::new(ConsoleReporter))
}

fn cmd_tree(stage: &Arc<Stage>) -> anyhow::Result<()> {
    println!("Layers: {}", stage.layer_names().join(", "));
    println!();
    for prim in stage.traverse_all() {
        let indent = "  ".repeat(prim.depth().saturating_sub(1));
        let inactive = if stage.is_active(&prim) { "" } else { " (inactive)" };
        println!("{}{}{}", indent, prim.name(), inactive);
        for name in CollectionApi::collection_names(stage, &prim) {
            println!("{}  [collection:{}]", indent, name);
        }
    }
    Ok(())
}

fn cmd_list(stage: &Arc<Stage>, settings: &Settings) -> anyhow::Result<()> {
    let ctx = context(settings);
    let collections = all_collections(stage);
    if collections.is_empty() {
        println!("No collections");
        return Ok(());
    }
    for (prim_path, name) in collections {
        let Some(prim) = stage.get_prim(&prim_path) else {
            continue;
        };
        let data = CollectionData::new(ctx.clone(), &prim, &name);
        let strategy = data
            .strategy()
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let conflict = if data.has_data_conflict() { "  CONFLICT" } else { "" };
        println!(
            "{:<40} {:>5} members  {}{}",
            format!("{}.collection:{}", prim_path, name),
            data.compute_membership().len(),
            strategy,
            conflict
        );
    }
    Ok(())
}

fn cmd_print(args: &[&str], settings: Settings) -> anyhow::Result<()> {
    let mut positional = Vec::new();
    let mut filter = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "--filter" {
            filter = Some(*iter.next().context("--filter needs a text argument")?);
        } else {
            positional.push(*arg);
        }
    }
    let [scene, prim_path, name] = positional.as_slice() else {
        bail!("expected <scene> <prim> <name>\nUsage: usdcoll print <scene.json> <prim> <name> [--filter TEXT]");
    };

    let stage = open_stage(scene)?;
    let prim_path: ScenePath = prim_path.parse()?;
    let prim = stage
        .get_prim(&prim_path)
        .with_context(|| format!("no prim at {}", prim_path))?;
    let data = CollectionData::new(context(&settings), &prim, name);

    match filter {
        None => data.print_collection(),
        Some(text) => {
            let mut list = FilteredStringList::new(
                data.compute_membership()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            );
            list.set_filter(text);
            if list.is_filtered_empty() {
                println!("No members match '{}'", text);
            }
            for item in list.filtered_items() {
                println!("{}", item);
            }
        }
    }
    Ok(())
}

fn cmd_check(stage: &Arc<Stage>, settings: &Settings) -> anyhow::Result<()> {
    let ctx = context(settings);
    let mut failures = 0;
    let mut conflicts = 0;
    for (prim_path, name) in all_collections(stage) {
        let Some(api) = CollectionApi::new(stage, &prim_path, &name) else {
            continue;
        };
        let state = api.rule_state();
        if let Some(text) = state.membership_expression.as_deref() {
            if let Err(e) = ctx.evaluator().compile(text) {
                println!("{}.collection:{}: {}", prim_path, name, e);
                failures += 1;
            }
        }
        if state.has_conflict() {
            println!(
                "{}.collection:{}: {}",
                prim_path,
                name,
                settings.conflict_policy.conflict_message()
            );
            conflicts += 1;
        }
    }
    println!("{} invalid expression(s), {} conflict(s)", failures, conflicts);
    if failures > 0 {
        bail!("{} collection(s) have invalid expressions", failures);
    }
    Ok(())
}
