// FlipMouse CLI
// Daemon entry point and one-shot control client

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::builder::PossibleValuesParser;
use clap::Parser;

use flipmouse_core::control::{send_command, ControlCommand, ControlServer};
use flipmouse_core::input::{discover, list_devices};
use flipmouse_core::output::UinputSink;
use flipmouse_core::{Dispatcher, Keymap, Settings, StatusFile};

/// Keypad to virtual mouse multiplexer
#[derive(Parser, Debug)]
#[command(name = "flipmouse")]
#[command(version)]
#[command(about = "Turn a phone keypad into a mouse", long_about = None)]
struct Args {
    /// Send a command to the running daemon and exit
    #[arg(value_parser = PossibleValuesParser::new(["enable", "disable", "toggle", "status", "quit"]))]
    command: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// List input devices and whether they are supported
    #[arg(long)]
    list_devices: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Client mode: one command, one reply line on stdout.
fn run_client(socket: &Path, token: &str) -> ExitCode {
    let Some(command) = ControlCommand::parse(token) else {
        eprintln!("Unknown command: {}", token);
        return ExitCode::from(1);
    };
    match send_command(socket, command) {
        Ok(reply) => {
            println!("{}", reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Control socket for client mode.
///
/// Only the socket path matters here, so a config file that fails to load
/// falls back to the default path instead of stopping the client.
fn client_socket(config: Option<&Path>) -> PathBuf {
    match Settings::load(config) {
        Ok(settings) => settings.paths.control_socket,
        Err(e) => {
            let fallback = Settings::default().paths.control_socket;
            log::warn!("Ignoring configuration ({}), using {}", e, fallback.display());
            fallback
        }
    }
}

fn print_devices(settings: &Settings) {
    let devices = list_devices(&settings.devices);
    if devices.is_empty() {
        println!("No input devices found (are you allowed to read /dev/input?)");
        return;
    }
    for info in devices {
        let support = match info.keymap {
            Some(keymap) => format!("supported, {} keymap", keymap.as_ref()),
            None => "unsupported".to_string(),
        };
        println!("{}: {} [{}]", info.path, info.name, support);
    }
}

fn install_signal_handlers(shutdown: &Arc<AtomicBool>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("Failed to register signal handlers")?;
    let shutdown = Arc::clone(shutdown);

    // The event loop polls the flag at least once per wait timeout
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::info!("Received signal {}, shutting down", signal);
            shutdown.store(true, Ordering::SeqCst);
        }
    });
    Ok(())
}

fn run_daemon(settings: Settings) -> anyhow::Result<()> {
    if let Some(path) = settings.source_path() {
        log::info!("Loaded settings from {}", path.display());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_signal_handlers(&shutdown)?;

    let discovery = discover(&settings.devices).context("Device discovery failed")?;

    let pointer = UinputSink::create_pointer().context("Cannot create virtual pointer")?;
    let status = StatusFile::new(&settings.paths.status_file);

    let mut dispatcher = Dispatcher::from_settings(
        &settings,
        Keymap::builtin(discovery.keymap),
        Box::new(pointer),
        Box::new(status),
    )
    .with_devices(discovery.devices)
    .with_shutdown_flag(Arc::clone(&shutdown));
    log::info!("Attached {} device(s)", dispatcher.device_count());

    dispatcher.park_pointer();
    dispatcher.publish_status();

    match ControlServer::bind(&settings.paths.control_socket) {
        Ok(control) => dispatcher = dispatcher.with_control(control),
        Err(e) => log::warn!("{} (continuing without control socket)", e),
    }

    dispatcher.run()?;
    log::info!("FlipMouse stopped");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(token) = args.command.as_deref() {
        return run_client(&client_socket(args.config.as_deref()), token);
    }

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.list_devices {
        print_devices(&settings);
        return ExitCode::SUCCESS;
    }

    match run_daemon(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
