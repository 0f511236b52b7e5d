use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::TerrainConfig;
use crate::dataset;
use crate::error::PipelineError;
use crate::scene::TerrainScene;
use crate::summit::format_usd;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the terrain scene and write it as JSON
    Build {
        /// Input CSV file (header row required); built-in films when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON file overriding configuration defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file for the scene JSON (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the summit table
    Summits {
        /// Input CSV file (header row required); built-in films when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON file overriding configuration defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, config, out, pretty } => {
            let config = load_config(config.as_deref())?;
            let scene = build_with_fallback(input.as_deref(), &config)?;
            write_scene(&scene, out.as_deref(), pretty)?;
        }
        Commands::Summits { input, config } => {
            let config = load_config(config.as_deref())?;
            let scene = build_with_fallback(input.as_deref(), &config)?;
            print_summits(&scene)?;
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TerrainConfig> {
    match path {
        Some(path) => TerrainConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(TerrainConfig::default()),
    }
}

/// Build from `input`, retrying with the built-in films if nothing in it is
/// usable or its years need more columns than the grid allows.
fn build_with_fallback(input: Option<&Path>, config: &TerrainConfig) -> Result<TerrainScene> {
    let raw = dataset::load_or_fallback(input);
    match TerrainScene::build(&raw, config) {
        Ok(scene) => Ok(scene),
        Err(PipelineError::EmptyDataset { total }) if input.is_some() => {
            log::warn!("No usable records among {} rows, using built-in films", total);
            Ok(TerrainScene::build(&dataset::fallback_records(), config)?)
        }
        Err(err @ PipelineError::TimeSpanTooLarge { .. }) if input.is_some() => {
            log::warn!("{}, using built-in films", err);
            Ok(TerrainScene::build(&dataset::fallback_records(), config)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_scene(scene: &TerrainScene, out: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(scene)?
    } else {
        serde_json::to_string(scene)?
    };

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} ({} vertices, {} summits)",
                path.display(),
                scene.mesh.vertices.len(),
                scene.annotations.len()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn print_summits(scene: &TerrainScene) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{} genres x {} bins, {} of {} records used, total impact {:.3e}",
        scene.axes.genres.len(),
        scene.axes.time_bins.len(),
        scene.stats.records_used,
        scene.stats.records_read,
        scene.stats.total_impact
    )?;
    for (rank, (summit, note)) in scene.summits.iter().zip(&scene.annotations).enumerate() {
        let gross = summit
            .best
            .as_ref()
            .map(|b| format_usd(b.gross))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            stdout,
            "{:>2}. {:<12} {:<10} {:>12.3e}  {:<32} {}  (height {:.1})",
            rank + 1,
            note.genre,
            note.time_bin,
            summit.sum,
            note.label,
            gross,
            note.position[1]
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_years_fall_back_to_built_in_films() {
        let path = std::env::temp_dir().join(format!(
            "boxoffice-terrain-years-{}.csv",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "Title,Worldwide_Gross,Profit_Margin_Pct,IMDb_Rating,Year,Main_Genre\n\
             Typo,100000000,250,7.0,201000000,Drama\n\
             Fine,100000000,250,7.0,2005,Drama\n",
        )
        .unwrap();

        let config = TerrainConfig::default();
        let scene = build_with_fallback(Some(&path), &config).unwrap();
        std::fs::remove_file(&path).unwrap();

        let expected = TerrainScene::build(&dataset::fallback_records(), &config).unwrap();
        assert_eq!(scene.axes, expected.axes);
        assert_eq!(scene.stats, expected.stats);
    }
}
