use infinitive_client::config::{self, Config};
use infinitive_client::InfinitiveClient;
use log::{error, info};
use std::path::PathBuf;

const USAGE: &str = "usage: infinitive [--env-file PATH] <status | vacation | set-temp <temp> <mode> | set-mode <mode> | set-fan [mode] | set-hold <value>>";

#[derive(Debug, PartialEq)]
enum Command {
    Status,
    Vacation,
    SetTemp { temp: f64, mode: String },
    SetMode(String),
    SetFan(Option<String>),
    SetHold(String),
}

#[derive(Debug, PartialEq)]
struct Cli {
    env_file: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli, String> {
    let mut env_file = None;
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--env-file" {
            let value = args.next().ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
            env_file = Some(PathBuf::from(value));
        } else if let Some(path) = arg.strip_prefix("--env-file=") {
            if path.is_empty() {
                return Err("`--env-file` requires a path argument".to_string());
            }
            env_file = Some(PathBuf::from(path));
        } else {
            positional.push(arg);
        }
    }

    let positional: Vec<&str> = positional.iter().map(String::as_str).collect();
    let command = match positional.as_slice() {
        ["status"] => Command::Status,
        ["vacation"] => Command::Vacation,
        ["set-temp", temp, mode] => Command::SetTemp {
            temp: temp.parse().map_err(|_| format!("temperature must be a number, got {:?}", temp))?,
            mode: mode.to_string(),
        },
        ["set-mode", mode] => Command::SetMode(mode.to_string()),
        ["set-fan"] => Command::SetFan(None),
        ["set-fan", fan] => Command::SetFan(Some(fan.to_string())),
        ["set-hold", hold] => Command::SetHold(hold.to_string()),
        _ => return Err(USAGE.to_string()),
    };

    Ok(Cli { env_file, command })
}

fn run(command: Command) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (host={}, port={}, temp_units={}, max_retries={})",
        cfg.host,
        cfg.port,
        cfg.temperature_unit.as_str(),
        cfg.max_retries
    );

    let client = InfinitiveClient::from_config(&cfg)
        .with_diagnostics(|failure| error!("Read from {} failed: {}", failure.url, failure.error));

    match command {
        Command::Status => print_json(&client.get_status()),
        Command::Vacation => print_json(&client.get_vacation_status()),
        Command::SetTemp { temp, mode } => client
            .set_temperature(temp, &mode)
            .map_err(|e| format!("set-temp failed: {}", e)),
        Command::SetMode(mode) => client.set_mode(&mode).map_err(|e| format!("set-mode failed: {}", e)),
        Command::SetFan(Some(fan)) => client.set_fan_mode(&fan).map_err(|e| format!("set-fan failed: {}", e)),
        Command::SetFan(None) => client.reset_fan_mode().map_err(|e| format!("set-fan failed: {}", e)),
        Command::SetHold(hold) => client.set_hold(hold).map_err(|e| format!("set-hold failed: {}", e)),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| format!("failed to render status: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn main() {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(2);
        }
    };

    let env_result = match &cli.env_file {
        Some(path) if !path.is_file() => Err(format!("env file not found: {}", path.display())),
        Some(path) => config::load_env_file(path).map(|_| Some(path.clone())),
        None => {
            let default_path = PathBuf::from(".env");
            if default_path.is_file() {
                config::load_env_file(&default_path).map(|_| Some(default_path))
            } else {
                Ok(None)
            }
        }
    };
    let loaded_env = match env_result {
        Ok(path) => path,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = loaded_env {
        info!("Environment loaded from {}", path.display());
    }
    info!(
        "infinitive {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );

    if let Err(e) = run(cli.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
