//! [`Args`] definitions.

use clap::Parser;

/// Server of the parking slot reservation system.
///
/// Serves GraphQL API for drivers and `Lot` operators, and expires overdue
/// bookings in background.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file.
    ///
    /// Missing file is fine: defaults and `CONF.*` environment variables
    /// are used then.
    #[arg(short, long, env = "CONF_FILE", default_value = "config.toml")]
    pub config: String,
}

impl Args {
    /// Parses command line arguments of the current process.
    ///
    /// # Errors
    ///
    /// If the arguments are malformed, or `--help`/`--version` is requested.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn parses_config_path() {
        let args =
            Args::try_parse_from(["server", "-c", "/etc/parking.toml"]).unwrap();
        assert_eq!(args.config, "/etc/parking.toml");

        let args =
            Args::try_parse_from(["server", "--config", "local.toml"]).unwrap();
        assert_eq!(args.config, "local.toml");
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["server", "--port", "80"]).is_err());
    }
}
