//! serterm - replay a serial capture through the console pipeline
//!
//! Reads a captured byte stream (file or stdin) in transport-sized chunks,
//! feeds it through the same pipeline an interactive UI would use, and
//! writes the resulting console text.
//!
//! # Quick Start
//!
//! ```text
//! serterm boot.log                 # Print console text of a capture
//! serterm --vt100 -t boot.log      # Interpret VT100, prefix timestamps
//! serterm --hex < dump.bin         # Show stdin as hex pairs
//! serterm -s "AT" -l 3 cap.bin     # Send a command to the loopback device
//! ```

use std::env;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use serterm::config::data_dir;
use serterm::{
    spawn_reader, Config, Console, ConsoleEvent, DataMode, DisplayMode, LineEnding,
    LoopbackTransport,
};

/// Bytes per simulated transport delivery
const DEFAULT_CHUNK: usize = 64;

/// Command line options
struct Args {
    /// Capture file, stdin when absent
    capture: Option<PathBuf>,
    /// Output file, stdout when absent
    output: Option<PathBuf>,
    hex: bool,
    timestamps: bool,
    vt100: Option<bool>,
    echo: bool,
    /// Render the console as a hex dump
    hex_display: bool,
    chunk: usize,
    line_ending: Option<LineEnding>,
    /// Commands sent after the capture, in order
    sends: Vec<Command>,
}

enum Command {
    Text(String),
    Hex(String),
}

impl Default for Args {
    fn default() -> Self {
        Self {
            capture: None,
            output: None,
            hex: false,
            timestamps: false,
            vt100: None,
            echo: false,
            hex_display: false,
            chunk: DEFAULT_CHUNK,
            line_ending: None,
            sends: Vec::new(),
        }
    }
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("serterm {}", VERSION);
}

fn print_help() {
    eprintln!("serterm {} - serial console pipeline", VERSION);
    eprintln!();
    eprintln!("Usage: serterm [OPTIONS] [CAPTURE]");
    eprintln!();
    eprintln!("Display options:");
    eprintln!("  -x, --hex             Show received bytes as hex pairs");
    eprintln!("  -t, --timestamps      Prefix each line with its capture time");
    eprintln!("      --vt100           Interpret VT100 clear sequences");
    eprintln!("      --no-vt100        Show escape sequences as text");
    eprintln!("  -d, --hex-dump        Write the console as a hex dump (display mode Hex)");
    eprintln!();
    eprintln!("Send options (loopback device):");
    eprintln!("  -s, --send <TEXT>     Send a text command");
    eprintln!("      --send-hex <HEX>  Send a command typed as hex pairs");
    eprintln!("  -l, --line-ending <N> 0 = None, 1 = LF, 2 = CR, 3 = CR+LF");
    eprintln!("  -e, --echo            Local echo of sent commands");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -c, --chunk <BYTES>   Bytes per delivery (default {})", DEFAULT_CHUNK);
    eprintln!("  -o, --output <FILE>   Write console text to FILE");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.serterm/config.toml");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    // Value following an option
    let value = |i: &mut usize, name: &str| -> Result<String, String> {
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| format!("Missing argument for {}", name))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-x" | "--hex" => parsed.hex = true,
            "-t" | "--timestamps" => parsed.timestamps = true,
            "--vt100" => parsed.vt100 = Some(true),
            "--no-vt100" => parsed.vt100 = Some(false),
            "-d" | "--hex-dump" => parsed.hex_display = true,
            "-e" | "--echo" => parsed.echo = true,
            "-s" | "--send" => {
                let text = value(&mut i, "--send")?;
                parsed.sends.push(Command::Text(text));
            }
            "--send-hex" => {
                let text = value(&mut i, "--send-hex")?;
                parsed.sends.push(Command::Hex(text));
            }
            "-l" | "--line-ending" => {
                let raw = value(&mut i, "--line-ending")?;
                let ending = raw
                    .parse::<usize>()
                    .ok()
                    .and_then(LineEnding::from_index)
                    .ok_or_else(|| format!("Invalid line ending: {}", raw))?;
                parsed.line_ending = Some(ending);
            }
            "-c" | "--chunk" => {
                let raw = value(&mut i, "--chunk")?;
                parsed.chunk = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid chunk size: {}", raw))?;
            }
            "-o" | "--output" => {
                parsed.output = Some(PathBuf::from(value(&mut i, "--output")?));
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => {
                if parsed.capture.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                if arg != "-" {
                    parsed.capture = Some(PathBuf::from(arg));
                }
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to ~/.serterm/serterm.log, or stderr if the file cannot be opened
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = data_dir()
        .map(|dir| dir.join("serterm.log"))
        .and_then(|path| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    let builder = FmtSubscriber::builder().with_env_filter(filter);
    let _ = match log_file {
        Some(file) => tracing::subscriber::set_global_default(
            builder
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .finish(),
        ),
        None => tracing::subscriber::set_global_default(
            builder.with_writer(io::stderr).finish(),
        ),
    };
}

/// Drain pending console events, counting display updates
fn count_updates(events: &Receiver<ConsoleEvent>) -> usize {
    events
        .try_iter()
        .filter(|e| *e == ConsoleEvent::DisplayChanged)
        .count()
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("serterm {} starting...", VERSION);

    // Command line options override the config file
    let mut config = Config::load();
    if args.hex {
        config.data_mode = DataMode::Hex;
    }
    if args.timestamps {
        config.show_timestamp = true;
    }
    if let Some(enabled) = args.vt100 {
        config.vt100_enabled = enabled;
    }
    if args.echo {
        config.echo = true;
    }
    if args.hex_display {
        config.display_mode = DisplayMode::Hex;
    }
    if let Some(ending) = args.line_ending {
        config.line_ending = ending;
    }

    info!("Data mode: {}", config.data_mode.label());
    info!("Display mode: {}", config.display_mode.label());
    info!("Line ending: {}", config.line_ending.label());
    info!("VT100: {}", config.vt100_enabled);

    let mut console = Console::new(config, LoopbackTransport::new());
    let events = console.subscribe();

    let source: Box<dyn Read + Send> = match &args.capture {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let reader = spawn_reader(source, args.chunk);
    let mut chunks = 0usize;
    let mut updates = 0usize;
    for chunk in reader.chunks.iter() {
        console.on_bytes_received(&chunk);
        chunks += 1;
        updates += count_updates(&events);
    }
    console.flush_decoder();
    info!("Replayed {} chunks", chunks);

    for send in &args.sends {
        let result = match send {
            Command::Text(text) => console.send(text),
            Command::Hex(text) => console.send_hex(text),
        };
        match result {
            Ok(n) => debug!("Sent {} bytes", n),
            Err(e) => warn!("Send failed: {}", e),
        }

        // The loopback device answers with whatever it was sent
        for chunk in console.transport_mut().take_incoming() {
            console.on_bytes_received(&chunk);
        }
    }

    updates += count_updates(&events);
    debug!("{} display updates", updates);

    let text = console.render();

    match &args.output {
        Some(path) => {
            fs::write(path, text.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Saved console to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
