use anyhow::{bail, Result};
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Serve(ServeOptions),
    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ServeOptions {
    pub config: Option<PathBuf>,
    pub bind: Option<String>,
}

/// Parse command-line arguments (without the program name).
///
/// Supported forms:
///   ticketing-gateway
///   ticketing-gateway serve --config ./gateway.toml
///   ticketing-gateway --bind 127.0.0.1:9000
///   ticketing-gateway help
pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut rest = args;
    match rest.first().map(String::as_str) {
        Some("help" | "-h" | "--help") => return Ok(Command::Help),
        Some("serve") => rest = &rest[1..],
        _ => {}
    }

    let mut options = ServeOptions::default();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                match rest.get(i) {
                    Some(path) => options.config = Some(PathBuf::from(path)),
                    None => bail!("Missing value for --config flag"),
                }
            }
            "-b" | "--bind" => {
                i += 1;
                match rest.get(i) {
                    Some(addr) => options.bind = Some(addr.clone()),
                    None => bail!("Missing value for --bind flag"),
                }
            }
            "-h" | "--help" => return Ok(Command::Help),
            other => bail!("Unknown argument: {other}\n\nRun `ticketing-gateway help` for usage."),
        }
        i += 1;
    }

    Ok(Command::Serve(options))
}

pub fn print_help() {
    println!("ticketing-gateway: REST facade for tickets, bugs and employees over a Bitrix24 CRM\n");
    println!("USAGE:");
    println!("  ticketing-gateway [serve] [OPTIONS]");
    println!("  ticketing-gateway help");
    println!();
    println!("OPTIONS:");
    println!("  -c, --config <path>  Config file (default: $TICKETING_GATEWAY_CONFIG or ~/.ticketing-gateway/config.toml)");
    println!("  -b, --bind <addr>    Listen address, overrides [server].bind");
    println!();
    println!("EXAMPLES:");
    println!("  ticketing-gateway serve --config ./gateway.toml");
    println!("  curl 'http://localhost:8080/?endpoint=tickets&page=1&limit=20'");
}
