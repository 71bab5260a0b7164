use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use iec62056_core::{Link, LinkConfig, TcpTransport, TransportConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "IEC 62056-21 link diagnostic tool", long_about = None)]
struct Args {
    /// Serial port of the optical probe (e.g. /dev/ttyUSB0)
    #[arg(long, conflicts_with_all = ["tcp", "config"])]
    serial: Option<String>,

    /// Initial serial baud rate
    #[arg(long, default_value_t = 300, requires = "serial")]
    baud: u32,

    /// TCP endpoint as HOST:PORT
    #[arg(long, conflicts_with = "config")]
    tcp: Option<String>,

    /// Path to a TOML link configuration
    #[arg(long)]
    config: Option<String>,

    /// Read timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Give up after this many NACKs for one block
    #[arg(long)]
    max_nack_retries: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one block-framed message
    Read {
        /// Bytes to send first; accepts \r, \n and \xNN escapes
        #[arg(long)]
        send: Option<String>,
    },
    /// Read from a start character through an end character
    SimpleRead {
        #[arg(long, default_value = "/")]
        start: String,
        #[arg(long, default_value = "\\n")]
        end: String,
        /// Bytes to send first; accepts \r, \n and \xNN escapes
        #[arg(long)]
        send: Option<String>,
    },
}

/// Decode `\r`, `\n`, `\t`, `\\` and `\xNN` escapes.
fn unescape(input: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('r') => out.push(b'\r'),
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16)
                    .with_context(|| format!("invalid escape \\x{hex}"))?;
                out.push(byte);
            }
            Some(other) => bail!("unknown escape \\{other}"),
            None => bail!("dangling backslash"),
        }
    }
    Ok(out)
}

fn single_byte(input: &str) -> Result<u8> {
    match unescape(input)?.as_slice() {
        [b] => Ok(*b),
        _ => Err(anyhow!("expected a single byte, got {input:?}")),
    }
}

fn build_config(args: &Args) -> Result<LinkConfig> {
    let mut config = if let Some(path) = &args.config {
        LinkConfig::load_from_file(path).with_context(|| format!("loading {path}"))?
    } else if let Some(port) = &args.serial {
        let mut c = LinkConfig::serial(port.clone());
        if let TransportConfig::Serial { baud_rate, .. } = &mut c.transport {
            *baud_rate = args.baud;
        }
        c
    } else if let Some(address) = &args.tcp {
        let parsed = TcpTransport::from_address(address, Duration::ZERO)?;
        LinkConfig::tcp(parsed.host(), parsed.port())
    } else {
        bail!("one of --serial, --tcp or --config is required");
    };

    if args.timeout.is_some() {
        config.timeout_secs = args.timeout;
    }
    if args.max_nack_retries.is_some() {
        config.max_nack_retries = args.max_nack_retries;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let mut link =
        Link::new(config.build_transport()).with_max_nack_retries(config.max_nack_retries);

    link.connect()?;
    info!(transport = %link.transport(), "Link open");

    let (send, delimiters) = match &args.command {
        Command::Read { send } => (send, None),
        Command::SimpleRead { start, end, send } => {
            (send, Some((single_byte(start)?, single_byte(end)?)))
        }
    };

    if let Some(text) = send {
        link.send(&unescape(text)?)?;
    }

    let data = match delimiters {
        None => link.read(None),
        Some((start, end)) => link.simple_read(start, end, None),
    };

    // Close the port even when the read failed.
    let closed = link.disconnect();
    let data = data?;
    closed?;

    println!("{}", data.escape_ascii());
    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iec62056_core::Transport;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("/?!\\r\\n").unwrap(), b"/?!\r\n");
        assert_eq!(unescape("\\x06050\\r\\n").unwrap(), b"\x06050\r\n");
        assert_eq!(unescape("a\\\\b").unwrap(), b"a\\b");
        assert!(unescape("\\q").is_err());
        assert!(unescape("\\xZZ").is_err());
        assert!(unescape("end\\").is_err());
    }

    #[test]
    fn test_single_byte() {
        assert_eq!(single_byte("/").unwrap(), b'/');
        assert_eq!(single_byte("\\n").unwrap(), b'\n');
        assert_eq!(single_byte("\\x02").unwrap(), 0x02);
        assert!(single_byte("ab").is_err());
    }

    #[test]
    fn test_build_config_tcp() {
        let args = Args::parse_from(["iec21", "--tcp", "10.0.0.5:8000", "--timeout", "3", "read"]);
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Tcp {
                host: "10.0.0.5".into(),
                port: 8000
            }
        );
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.build_transport().requires_address());
    }

    #[test]
    fn test_build_config_serial() {
        let args = Args::parse_from([
            "iec21",
            "--serial",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "simple-read",
            "--start",
            "/",
            "--end",
            "!",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Serial {
                port: "/dev/ttyUSB0".into(),
                baud_rate: 9600
            }
        );
        assert!(matches!(args.command, Command::SimpleRead { .. }));
    }

    #[test]
    fn test_requires_a_transport() {
        let args = Args::parse_from(["iec21", "read"]);
        assert!(build_config(&args).is_err());
    }
}
