//! Geogate Daemon - Main entry point
//!
//! Runs the lock actor against scripted device services and reads operator
//! commands from stdin.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geogate_core::{
    AppLifecycle, BiometryKind, ChallengeError, Coordinate, PermissionResponse, PositionError,
    SensorAvailability,
};
use geogate_daemon::scripted::{
    LogNotifier, ManualLifecycle, ScriptedChallenger, ScriptedPermission, ScriptedPosition,
};
use geogate_daemon::{render_status, Collaborators, GateConfig, LockActor};

/// Geogate - location-gated biometric lock
#[derive(Parser)]
#[command(name = "geogate-daemon")]
#[command(about = "Location-gated biometric lock controller")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session against scripted device services
    Run {
        /// Position answer: "LAT,LON" or "fail"
        #[arg(long, default_value = "1.0,2.0", value_parser = parse_fix)]
        fix: FixArg,

        /// Delay before the position answer, in milliseconds
        #[arg(long, default_value = "0")]
        fix_delay_ms: u64,

        /// Permission dialog answer
        #[arg(long, value_enum, default_value = "granted")]
        permission: PermissionArg,

        /// Biometric prompt answer
        #[arg(long, value_enum, default_value = "pass")]
        challenge: ChallengeArg,

        /// Biometric sensor class reported by the device
        #[arg(long, value_enum, default_value = "generic")]
        sensor: SensorArg,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Debug)]
enum FixArg {
    At(Coordinate),
    Fail,
}

fn parse_fix(value: &str) -> Result<FixArg, String> {
    if value.eq_ignore_ascii_case("fail") {
        return Ok(FixArg::Fail);
    }
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON or fail, got {:?}", value))?;
    let latitude: f64 = lat.trim().parse().map_err(|e| format!("latitude: {}", e))?;
    let longitude: f64 = lon.trim().parse().map_err(|e| format!("longitude: {}", e))?;
    Ok(FixArg::At(Coordinate::new(latitude, longitude)))
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PermissionArg {
    Granted,
    Denied,
    Blocked,
    Unavailable,
}

impl From<PermissionArg> for PermissionResponse {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Granted => PermissionResponse::Granted,
            PermissionArg::Denied => PermissionResponse::Denied,
            PermissionArg::Blocked => PermissionResponse::Blocked,
            PermissionArg::Unavailable => PermissionResponse::Unavailable,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChallengeArg {
    Pass,
    Fail,
    Error,
}

impl ChallengeArg {
    fn verdict(self) -> Result<bool, ChallengeError> {
        match self {
            ChallengeArg::Pass => Ok(true),
            ChallengeArg::Fail => Ok(false),
            ChallengeArg::Error => Err(ChallengeError::Hardware("simulated sensor fault".into())),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SensorArg {
    None,
    Fingerprint,
    Face,
    Generic,
}

impl From<SensorArg> for SensorAvailability {
    fn from(arg: SensorArg) -> Self {
        match arg {
            SensorArg::None => SensorAvailability::new(false, BiometryKind::None),
            SensorArg::Fingerprint => SensorAvailability::new(true, BiometryKind::Fingerprint),
            SensorArg::Face => SensorAvailability::new(true, BiometryKind::Face),
            SensorArg::Generic => SensorAvailability::new(true, BiometryKind::Generic),
        }
    }
}

const HELP: &str = "commands: fg | bg | tap | challenge | status | help | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geogate_daemon=info,geogate_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(GateConfig::default_path);

    match cli.command {
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!("{:?} already exists (use --force to overwrite)", config_path);
            }
            GateConfig::default().save(&config_path)?;
            println!("Wrote default config to {}", config_path.display());
            Ok(())
        }
        Commands::Run {
            fix,
            fix_delay_ms,
            permission,
            challenge,
            sensor,
        } => {
            let config = GateConfig::load_or_create(&config_path)?;
            run(config, fix, fix_delay_ms, permission, challenge, sensor).await
        }
    }
}

async fn run(
    config: GateConfig,
    fix: FixArg,
    fix_delay_ms: u64,
    permission: PermissionArg,
    challenge: ChallengeArg,
    sensor: SensorArg,
) -> anyhow::Result<()> {
    info!("Starting Geogate v{}", env!("CARGO_PKG_VERSION"));

    let fix = match fix {
        FixArg::At(coordinate) => Ok(coordinate),
        FixArg::Fail => Err(PositionError::new("location provider unavailable")),
    };
    let lifecycle = Arc::new(ManualLifecycle::new());
    let collaborators = Collaborators {
        position: Arc::new(
            ScriptedPosition::new(fix).with_delay(std::time::Duration::from_millis(fix_delay_ms)),
        ),
        permissions: Arc::new(ScriptedPermission::new(permission.into())),
        biometrics: Arc::new(ScriptedChallenger::new(sensor.into(), challenge.verdict())),
        lifecycle: lifecycle.clone(),
        notifier: Arc::new(LogNotifier::new()),
    };

    let handle = LockActor::spawn(&config, collaborators);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "fg" => {
                        lifecycle.emit(AppLifecycle::Foreground);
                    }
                    "bg" => {
                        lifecycle.emit(AppLifecycle::Background);
                    }
                    "tap" => handle.request_unlock().await?,
                    "challenge" => handle.start_challenge().await?,
                    "status" => println!("{}", render_status(&handle.snapshot())),
                    "help" => println!("{}", HELP),
                    "quit" | "exit" => break,
                    other => println!("unknown command {:?}; {}", other, HELP),
                }
            }
        }
    }

    handle.shutdown().await?;
    info!("Geogate shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fix() {
        match parse_fix("1.5, -2").unwrap() {
            FixArg::At(c) => assert_eq!(c, Coordinate::new(1.5, -2.0)),
            FixArg::Fail => panic!("expected a coordinate"),
        }
        assert!(matches!(parse_fix("FAIL").unwrap(), FixArg::Fail));
        assert!(parse_fix("1.5").is_err());
        assert!(parse_fix("north,2").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "geogate-daemon",
            "run",
            "--fix",
            "fail",
            "--permission",
            "blocked",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                fix: FixArg::Fail,
                permission: PermissionArg::Blocked,
                ..
            }
        ));
    }

    #[test]
    fn test_config_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["geogate-daemon", "run", "--config", "gate.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gate.json")));
        assert!(matches!(cli.command, Commands::Run { .. }));

        let cli = Cli::try_parse_from([
            "geogate-daemon",
            "--config",
            "other.json",
            "init-config",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("other.json")));
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));
    }
}
