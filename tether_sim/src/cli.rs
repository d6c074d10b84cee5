use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Tether: bridges simulated bodies and vehicles to a publish/subscribe
/// control plane.
///
/// Runs a scenario headless, with an in-process transport, a scripted command
/// source and a state monitor closing the loop.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run, relative to `--root`.
    #[arg(short, long, default_value = "assets/scenarios/default.toml")]
    pub scenario: PathBuf,

    /// Overrides `simulation.duration_seconds` from the scenario.
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Root directory for relative asset paths. Defaults to the working directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_bundled_scenario() {
        let cli = Cli::parse_from(["tether_sim"]);
        assert_eq!(cli.scenario, PathBuf::from("assets/scenarios/default.toml"));
        assert!(cli.duration.is_none());
        assert!(cli.root.is_none());
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::parse_from([
            "tether_sim",
            "--scenario",
            "other.toml",
            "--duration",
            "2.5",
            "--root",
            "/srv/tether",
        ]);
        assert_eq!(cli.scenario, PathBuf::from("other.toml"));
        assert_eq!(cli.duration, Some(2.5));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/tether")));
    }
}
