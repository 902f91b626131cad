//! Command-line interface definitions for dockward.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::Parser;
use thiserror::Error;

/// Forward host TCP ports into a Docker container.
///
/// dockward listens on the given host ports and relays every accepted
/// connection to the same port inside the container, through a
/// per-connection `socat` subprocess run via `docker exec`. The container's
/// own network configuration is left untouched.
#[derive(Parser, Debug)]
#[command(name = "dockward")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ports to forward, as a comma-separated list (e.g. '8080' or
    /// '8080,3000,5432').
    ///
    /// Each listed host port is forwarded to the identical port inside the
    /// container. Port ranges are not supported.
    #[arg(short = 'p', long = "ports", value_name = "PORTS")]
    pub ports: String,

    /// The ID (or name) of the docker container to forward into.
    #[arg(short = 'c', long = "container", value_name = "CONTAINER_ID")]
    pub container: String,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = debug level
    /// -vv   = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Errors from parsing the `--ports` value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortListError {
    /// The list contained no ports at all.
    #[error("You must specify a port, or list of ports")]
    Empty,

    /// A colon form like '8080:1234' was given.
    #[error("Port ranges ('{0}') are not supported; use a comma-separated list of ports")]
    RangeUnsupported(String),

    /// A list entry was not a valid port number.
    #[error("Failed to parse port '{0}'")]
    Invalid(String),

    /// The same port was listed twice.
    #[error("Port {0} is listed more than once")]
    Duplicate(u16),
}

impl Cli {
    /// Parse the configured port list.
    pub fn port_list(&self) -> Result<Vec<u16>, PortListError> {
        parse_port_list(&self.ports)
    }
}

/// Parse a comma-separated list of ports.
///
/// Entries are trimmed and empty entries skipped, so trailing commas are
/// tolerated. A colon in any entry is rejected outright rather than treated
/// as a range.
pub fn parse_port_list(list: &str) -> Result<Vec<u16>, PortListError> {
    let mut ports = Vec::new();

    for part in list.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.contains(':') {
            return Err(PortListError::RangeUnsupported(part.to_string()));
        }
        let port: u16 = part
            .parse()
            .map_err(|_| PortListError::Invalid(part.to_string()))?;
        if ports.contains(&port) {
            return Err(PortListError::Duplicate(port));
        }
        ports.push(port);
    }

    if ports.is_empty() {
        return Err(PortListError::Empty);
    }

    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_port() {
        assert_eq!(parse_port_list("8080"), Ok(vec![8080]));
    }

    #[test]
    fn test_parse_port_list_valid() {
        assert_eq!(parse_port_list("8080,3000,5432"), Ok(vec![8080, 3000, 5432]));
        assert_eq!(parse_port_list(" 8080 , 3000 "), Ok(vec![8080, 3000]));
        // Trailing comma is tolerated
        assert_eq!(parse_port_list("8080,"), Ok(vec![8080]));
    }

    #[test]
    fn test_parse_port_list_empty() {
        assert_eq!(parse_port_list(""), Err(PortListError::Empty));
        assert_eq!(parse_port_list(" , ,"), Err(PortListError::Empty));
    }

    #[test]
    fn test_parse_port_list_range_rejected() {
        assert_eq!(
            parse_port_list("8080:1234"),
            Err(PortListError::RangeUnsupported("8080:1234".to_string()))
        );
        assert_eq!(
            parse_port_list("80,8080:1234"),
            Err(PortListError::RangeUnsupported("8080:1234".to_string()))
        );
    }

    #[test]
    fn test_parse_port_list_invalid() {
        assert_eq!(
            parse_port_list("http"),
            Err(PortListError::Invalid("http".to_string()))
        );
        assert_eq!(
            parse_port_list("70000"),
            Err(PortListError::Invalid("70000".to_string()))
        );
        assert_eq!(
            parse_port_list("-1"),
            Err(PortListError::Invalid("-1".to_string()))
        );
    }

    #[test]
    fn test_parse_port_list_duplicate() {
        assert_eq!(
            parse_port_list("8080,3000,8080"),
            Err(PortListError::Duplicate(8080))
        );
    }

    #[test]
    fn test_cli_parse_basic() {
        let cli = Cli::parse_from(["dockward", "-p", "8080,3000", "-c", "deadbeef"]);
        assert_eq!(cli.ports, "8080,3000");
        assert_eq!(cli.container, "deadbeef");
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.port_list(), Ok(vec![8080, 3000]));
    }

    #[test]
    fn test_cli_parse_long_options() {
        let cli = Cli::parse_from([
            "dockward",
            "--ports",
            "9000",
            "--container",
            "web-1",
            "-vv",
        ]);
        assert_eq!(cli.ports, "9000");
        assert_eq!(cli.container, "web-1");
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_requires_ports_and_container() {
        assert!(Cli::try_parse_from(["dockward", "-c", "deadbeef"]).is_err());
        assert!(Cli::try_parse_from(["dockward", "-p", "8080"]).is_err());
    }
}
