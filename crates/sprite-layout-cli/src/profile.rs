//! Loads named profiles from an INI-style config file and applies them
//! onto a `PackingOptions`, per the CLI's profile-file contract in
//! spec.md §6: one `[profile NAME]` section per profile, snake_case
//! long-flag keys, missing keys inherit the built-in defaults already
//! present in the target `PackingOptions`.

use std::path::{Path, PathBuf};

use ini::Ini;
use sprite_layout_core::{
    LayoutError, Mode, Optimize, PackingOptions, Resolution, ResolutionReference, Result,
};

/// Locates the profiles config file by the fixed lookup order spec.md §6
/// leaves implementation-defined: an explicit path first, then the
/// per-user config directory (as `freddiehaddad-oxidized`'s `core-config`
/// resolves its own config path via `dirs::config_dir()`), then the
/// working directory, then an installed global location. Returns `None`
/// if nothing is found anywhere in the chain.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return p.is_file().then(|| p.to_path_buf());
    }
    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("sprite-layout").join("profiles.ini");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let cwd = PathBuf::from("profiles.ini");
    if cwd.is_file() {
        return Some(cwd);
    }
    let global = PathBuf::from("/etc/sprite-layout/profiles.ini");
    global.is_file().then_some(global)
}

/// Applies profile `name`'s keys from `path` onto `opts` in place.
/// An unknown profile name, an unreadable/malformed file, or an
/// unrecognized or unparsable key is a `ConfigError`.
pub fn apply(path: &Path, name: &str, opts: &mut PackingOptions) -> Result<()> {
    let ini = Ini::load_from_file(path)
        .map_err(|e| LayoutError::ConfigError(format!("{}: {e}", path.display())))?;
    let section_name = format!("profile {name}");
    let section = ini
        .section(Some(section_name.as_str()))
        .ok_or_else(|| LayoutError::ConfigError(format!("unknown profile '{name}'")))?;

    for (key, value) in section.iter() {
        set_field(opts, key, value)?;
    }
    Ok(())
}

fn set_field(opts: &mut PackingOptions, key: &str, value: &str) -> Result<()> {
    let bad = |field: &str| LayoutError::ConfigError(format!("invalid {field} '{value}'"));
    match key {
        "mode" => opts.mode = value.parse::<Mode>().map_err(|_| bad("mode"))?,
        "optimize" => opts.optimize = value.parse::<Optimize>().map_err(|_| bad("optimize"))?,
        "padding" => opts.padding = value.parse().map_err(|_| bad("padding"))?,
        "max_width" => opts.max_width = Some(value.parse().map_err(|_| bad("max_width"))?),
        "max_height" => opts.max_height = Some(value.parse().map_err(|_| bad("max_height"))?),
        "max_combinations" => {
            opts.max_combinations = value.parse().map_err(|_| bad("max_combinations"))?
        }
        "scale" => opts.scale = value.parse().map_err(|_| bad("scale"))?,
        "trim_transparent" => opts.trim_transparent = parse_bool(value)?,
        "rotate" => opts.rotate_allowed = parse_bool(value)?,
        "threads" => opts.threads = value.parse().map_err(|_| bad("threads"))?,
        "source_resolution" => {
            opts.source_resolution = Some(value.parse::<Resolution>().map_err(|_| bad("source_resolution"))?)
        }
        "target_resolution" => {
            opts.target_resolution = Some(value.parse::<Resolution>().map_err(|_| bad("target_resolution"))?)
        }
        "resolution_reference" => {
            opts.resolution_reference = value
                .parse::<ResolutionReference>()
                .map_err(|_| bad("resolution_reference"))?
        }
        other => {
            return Err(LayoutError::ConfigError(format!(
                "unrecognized profile key '{other}'"
            )))
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(LayoutError::ConfigError(format!(
            "invalid boolean '{other}'"
        ))),
    }
}
