//! spacesync CLI
//!
//! Configuration helper and control client for the spacesync daemon.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic};
use spacesync_config::{Config, DEFAULT_CONFIG_PATH};
use spacesync_daemon::ipc::{default_socket_path, IpcRequest, IpcResponse};
use spacesync_daemon::{Space, SpaceId};
use tracing::debug;

/// How long to wait for the daemon to answer a single request
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "spacesync")]
#[command(about = "Window-manager space synchronizer")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Daemon control socket (overrides config setting)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Generate the yabai signal script
    Signals {
        /// Write the script here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List spaces and their windows
    Spaces {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch to a space
    FocusSpace {
        id: String,

        /// Also focus the first window if the space has no focused window
        #[arg(short = 'w', long)]
        focus_window: bool,
    },

    /// Focus a window by id
    FocusWindow { id: u64 },

    /// Ask the daemon to re-query the window manager
    Refresh,

    /// Show current daemon status
    Status,

    /// Print every change to the space list until interrupted
    Watch {
        /// Print one JSON document per line
        #[arg(long)]
        json: bool,
    },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    let socket_flag = cli.socket;

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Signals { output } => cmd_signals(&config_path, output),
        Commands::Spaces { json } => cmd_spaces(&resolve_socket(&config_path, socket_flag)?, json),
        Commands::FocusSpace { id, focus_window } => {
            cmd_focus_space(&resolve_socket(&config_path, socket_flag)?, id, focus_window)
        }
        Commands::FocusWindow { id } => {
            cmd_focus_window(&resolve_socket(&config_path, socket_flag)?, id)
        }
        Commands::Refresh => cmd_refresh(&resolve_socket(&config_path, socket_flag)?),
        Commands::Status => cmd_status(&resolve_socket(&config_path, socket_flag)?),
        Commands::Watch { json } => cmd_watch(&resolve_socket(&config_path, socket_flag)?, json),
    }
}

/// `--socket`, then the configured control socket, then the default path
fn resolve_socket(config_path: &Path, flag: Option<PathBuf>) -> miette::Result<PathBuf> {
    if let Some(socket) = flag {
        return Ok(socket);
    }
    let config = spacesync_config::load_config(config_path)?;
    Ok(config.global.control_socket.unwrap_or_else(default_socket_path))
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = spacesync_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    print_config_summary(&config);
    Ok(())
}

fn print_config_summary(config: &Config) {
    let backend = &config.backend;
    println!("  Backend: {}", backend.kind);
    match backend.poll_interval() {
        Some(interval) => println!("    Poll interval: {:?}", interval),
        None => println!("    Poll interval: disabled (notifications only)"),
    }
    println!("    Focus settle: {:?}", backend.focus_settle());
    println!("    Command timeout: {:?}", backend.command_timeout());
    println!("  yabai: {}", config.yabai.binary);
    println!("    Signal socket: {}", config.yabai.socket_path.display());
    println!("  AeroSpace: {}", config.aerospace.binary);
    if let Some(socket) = &config.global.control_socket {
        println!("  Control socket: {}", socket.display());
    }
}

fn cmd_signals(config_path: &Path, output: Option<PathBuf>) -> miette::Result<()> {
    let config = spacesync_config::load_config(config_path)?;

    match output {
        Some(output) => {
            spacesync_config::write_yabai_signals(&config, config_path, &output)?;
            println!("Wrote yabai signals to {}", output.display());
        }
        None => print!(
            "{}",
            spacesync_config::generate_yabai_signals(&config, config_path)
        ),
    }

    Ok(())
}

fn connect(socket: &Path) -> miette::Result<UnixStream> {
    debug!(socket = %socket.display(), "Connecting to daemon");
    UnixStream::connect(socket)
        .into_diagnostic()
        .wrap_err_with(|| {
            format!(
                "Failed to connect to {} (is spacesyncd running?)",
                socket.display()
            )
        })
}

fn write_request(stream: &mut UnixStream, request: &IpcRequest) -> miette::Result<()> {
    let mut json = serde_json::to_string(request).into_diagnostic()?;
    debug!(request = %json, "Sending request");
    json.push('\n');
    stream
        .write_all(json.as_bytes())
        .into_diagnostic()
        .wrap_err("Failed to send request")
}

fn read_response(reader: &mut impl BufRead) -> miette::Result<Option<IpcResponse>> {
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .into_diagnostic()
        .wrap_err("Failed to read response")?;
    if bytes_read == 0 {
        return Ok(None);
    }
    serde_json::from_str(line.trim())
        .into_diagnostic()
        .wrap_err("Daemon sent an invalid response")
        .map(Some)
}

/// Send one request and wait for its response
fn send_request(socket: &Path, request: &IpcRequest) -> miette::Result<IpcResponse> {
    let mut stream = connect(socket)?;
    stream
        .set_read_timeout(Some(RESPONSE_TIMEOUT))
        .into_diagnostic()?;
    write_request(&mut stream, request)?;

    read_response(&mut BufReader::new(stream))?
        .ok_or_else(|| miette::miette!("Daemon closed the connection without responding"))
}

/// Print the message of a `success` response, turn anything else into an error
fn expect_success(response: IpcResponse) -> miette::Result<()> {
    match response {
        IpcResponse::Success { message } => {
            if let Some(message) = message {
                println!("{}", message);
            }
            Ok(())
        }
        IpcResponse::Error { message } => Err(miette::miette!("{}", message)),
        other => Err(miette::miette!("Unexpected response: {:?}", other)),
    }
}

fn format_spaces(spaces: &[Space]) -> String {
    if spaces.is_empty() {
        return "No spaces\n".to_string();
    }

    let mut output = String::new();
    for space in spaces {
        let marker = if space.is_focused { "*" } else { " " };
        output.push_str(&format!(
            "{} {} ({} window{})\n",
            marker,
            space.id,
            space.windows.len(),
            if space.windows.len() == 1 { "" } else { "s" }
        ));
        for window in &space.windows {
            let marker = if window.is_focused { ">" } else { " " };
            match &window.app_name {
                Some(app) => output.push_str(&format!(
                    "    {} [{}] {} - {}\n",
                    marker, window.id, app, window.title
                )),
                None => output.push_str(&format!("    {} [{}] {}\n", marker, window.id, window.title)),
            }
        }
    }
    output
}

fn print_spaces(spaces: &[Space], json: bool) -> miette::Result<()> {
    if json {
        println!("{}", serde_json::to_string(spaces).into_diagnostic()?);
    } else {
        print!("{}", format_spaces(spaces));
    }
    Ok(())
}

fn cmd_spaces(socket: &Path, json: bool) -> miette::Result<()> {
    match send_request(socket, &IpcRequest::Spaces)? {
        IpcResponse::Spaces { spaces } => print_spaces(&spaces, json),
        IpcResponse::Error { message } => Err(miette::miette!("{}", message)),
        other => Err(miette::miette!("Unexpected response: {:?}", other)),
    }
}

fn cmd_focus_space(socket: &Path, id: String, focus_window: bool) -> miette::Result<()> {
    let request = IpcRequest::FocusSpace {
        space: SpaceId::new(id),
        need_window_focus: focus_window,
    };
    expect_success(send_request(socket, &request)?)
}

fn cmd_focus_window(socket: &Path, id: u64) -> miette::Result<()> {
    expect_success(send_request(socket, &IpcRequest::FocusWindow { window: id })?)
}

fn cmd_refresh(socket: &Path) -> miette::Result<()> {
    expect_success(send_request(socket, &IpcRequest::Refresh)?)
}

fn cmd_status(socket: &Path) -> miette::Result<()> {
    match send_request(socket, &IpcRequest::Status)? {
        IpcResponse::Status {
            backend,
            event_based,
            listening,
            monitoring,
            spaces,
        } => {
            println!("Daemon: running ({})", socket.display());
            match backend {
                Some(backend) => {
                    let mode = if event_based { "push" } else { "poll" };
                    println!("Backend: {} ({})", backend, mode);
                }
                None => println!("Backend: none (no supported window manager found)"),
            }
            println!("Monitoring: {}", if monitoring { "yes" } else { "no" });
            if event_based {
                println!("Signal listener: {}", if listening { "up" } else { "down" });
            }
            println!("Spaces: {}", spaces);
            Ok(())
        }
        IpcResponse::Error { message } => Err(miette::miette!("{}", message)),
        other => Err(miette::miette!("Unexpected response: {:?}", other)),
    }
}

fn cmd_watch(socket: &Path, json: bool) -> miette::Result<()> {
    let mut stream = connect(socket)?;
    write_request(&mut stream, &IpcRequest::Subscribe)?;

    let mut reader = BufReader::new(stream);
    while let Some(response) = read_response(&mut reader)? {
        match response {
            IpcResponse::Spaces { spaces } => {
                print_spaces(&spaces, json)?;
                if !json {
                    println!();
                }
            }
            IpcResponse::Error { message } => return Err(miette::miette!("{}", message)),
            other => return Err(miette::miette!("Unexpected response: {:?}", other)),
        }
    }

    println!("Daemon closed the connection");
    Ok(())
}
