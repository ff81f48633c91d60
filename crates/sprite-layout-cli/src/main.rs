//! Command-line front end: resolves the positional input argument into
//! an ordered path list, layers `--profile`/explicit flags onto a
//! `PackingOptions`, runs the layout pipeline, and writes the result.
//! Grounded in the teacher CLI's `main.rs` shape (global verbose/quiet,
//! `tracing_subscriber::fmt`, `clap` derive with `help_heading`s), but
//! `main` returns `ExitCode` directly instead of `anyhow::Result<()>`
//! so the specific 1/2/3/other exit codes spec.md §6 fixes survive
//! intact instead of collapsing to anyhow's always-1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use sprite_layout_core::cache::{default_cache_dir, LayoutCache};
use sprite_layout_core::{
    pipeline, LayoutError, Mode, Optimize, PackingOptions, Resolution, ResolutionReference,
};
use tracing::error;

mod input;
mod profile;

#[derive(Parser, Debug)]
#[command(
    name = "sprite-layout",
    about = "Resolve a directory or path list of images into a texture-atlas layout",
    version,
    author
)]
struct Cli {
    /// A directory of images, or a plain-text file listing image paths
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,

    /// Named profile to load from the profiles config
    #[arg(long, help_heading = "Profile")]
    profile: Option<String>,

    /// Explicit path to the profiles config file
    #[arg(long, help_heading = "Profile")]
    profiles_config: Option<PathBuf>,

    /// Packing strategy: compact, pot, or fast
    #[arg(long, value_parser = parse_mode, help_heading = "Layout")]
    mode: Option<Mode>,

    /// Driver scoring objective: gpu or space
    #[arg(long, value_parser = parse_optimize, help_heading = "Layout")]
    optimize: Option<Optimize>,

    /// Pixels of padding reserved around every sprite
    #[arg(long, help_heading = "Layout")]
    padding: Option<u32>,

    /// Cap on the number of compact candidate trials (0 = unbounded)
    #[arg(long, help_heading = "Layout")]
    max_combinations: Option<u32>,

    /// Uniform rescale factor applied before packing, in (0, 1]
    #[arg(long, help_heading = "Layout")]
    scale: Option<f64>,

    /// Crop transparent borders before packing
    #[arg(
        long,
        action = ArgAction::SetTrue,
        overrides_with = "no_trim_transparent",
        help_heading = "Image Processing"
    )]
    trim_transparent: bool,

    /// Pack full image bounds, ignoring transparent borders
    #[arg(
        long,
        action = ArgAction::SetTrue,
        overrides_with = "trim_transparent",
        help_heading = "Image Processing"
    )]
    no_trim_transparent: bool,

    /// Allow 90-degree rotation (compact mode only)
    #[arg(long, action = ArgAction::SetTrue, help_heading = "Layout")]
    rotate: bool,

    /// Hard ceiling on the atlas width
    #[arg(long, help_heading = "Layout")]
    max_width: Option<u32>,

    /// Hard ceiling on the atlas height
    #[arg(long, help_heading = "Layout")]
    max_height: Option<u32>,

    /// Worker thread count
    #[arg(long, help_heading = "Concurrency")]
    threads: Option<usize>,

    /// Source resolution as WxH, paired with --target-resolution
    #[arg(long, value_parser = parse_resolution, help_heading = "Rescale")]
    source_resolution: Option<Resolution>,

    /// Target resolution as WxH, or "source" to keep the source's ratio
    #[arg(long, value_parser = parse_target_resolution, help_heading = "Rescale")]
    target_resolution: Option<TargetResolution>,

    /// Which side of the WxH ratio composes the effective scale
    #[arg(long, value_parser = parse_resolution_reference, help_heading = "Rescale")]
    resolution_reference: Option<ResolutionReference>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true, help_heading = "Logging")]
    verbose: u8,

    /// Quiet mode: only errors are logged
    #[arg(short, long, default_value_t = false, global = true, help_heading = "Logging")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy)]
enum TargetResolution {
    Source,
    Explicit(Resolution),
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse().map_err(|_| format!("invalid mode '{s}'"))
}

fn parse_optimize(s: &str) -> Result<Optimize, String> {
    s.parse().map_err(|_| format!("invalid optimize '{s}'"))
}

fn parse_resolution(s: &str) -> Result<Resolution, String> {
    s.parse().map_err(|_| format!("invalid resolution '{s}', expected WxH"))
}

fn parse_resolution_reference(s: &str) -> Result<ResolutionReference, String> {
    s.parse()
        .map_err(|_| format!("invalid resolution reference '{s}'"))
}

fn parse_target_resolution(s: &str) -> Result<TargetResolution, String> {
    if s.eq_ignore_ascii_case("source") {
        Ok(TargetResolution::Source)
    } else {
        s.parse().map(TargetResolution::Explicit).map_err(|_| {
            format!("invalid target resolution '{s}', expected WxH or 'source'")
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> sprite_layout_core::Result<String> {
    let mut opts = PackingOptions::default();

    match (&cli.profile, &cli.profiles_config) {
        (Some(name), explicit) => {
            let path = profile::locate(explicit.as_deref()).ok_or_else(|| {
                LayoutError::ConfigError("no profiles config file found".into())
            })?;
            profile::apply(&path, name, &mut opts)?;
        }
        (None, Some(path)) => {
            return Err(LayoutError::UsageError(format!(
                "--profiles-config given without --profile: {}",
                path.display()
            )));
        }
        (None, None) => {}
    }

    if let Some(v) = cli.mode {
        opts.mode = v;
    }
    if let Some(v) = cli.optimize {
        opts.optimize = v;
    }
    if let Some(v) = cli.padding {
        opts.padding = v;
    }
    if let Some(v) = cli.max_combinations {
        opts.max_combinations = v;
    }
    if let Some(v) = cli.scale {
        opts.scale = v;
    }
    if cli.trim_transparent {
        opts.trim_transparent = true;
    }
    if cli.no_trim_transparent {
        opts.trim_transparent = false;
    }
    if cli.rotate {
        opts.rotate_allowed = true;
    }
    if cli.max_width.is_some() {
        opts.max_width = cli.max_width;
    }
    if cli.max_height.is_some() {
        opts.max_height = cli.max_height;
    }
    if let Some(v) = cli.threads {
        opts.threads = v;
    }
    if let Some(v) = cli.source_resolution {
        opts.source_resolution = Some(v);
    }
    if let Some(target) = cli.target_resolution {
        let resolved = match target {
            TargetResolution::Source => opts.source_resolution.ok_or_else(|| {
                LayoutError::UsageError(
                    "--target-resolution source requires --source-resolution".into(),
                )
            })?,
            TargetResolution::Explicit(r) => r,
        };
        opts.target_resolution = Some(resolved);
    }
    if let Some(v) = cli.resolution_reference {
        opts.resolution_reference = v;
    }

    opts.validate()?;

    let paths = input::resolve(&cli.input)?;
    if paths.is_empty() {
        return Err(LayoutError::InputError(
            "no input images found under the given path".into(),
        ));
    }

    let cache = LayoutCache::new(default_cache_dir());
    cache.prune();
    pipeline::run(&paths, &opts, Some(&cache))
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
