use anyhow::Context;
use clap::Parser;
use parking_engine::app::simulate_arrivals;
use parking_engine::config::cli::{ClientCommand, Command, ParkingCommand, SessionCommand};
use parking_engine::config::toml_config::TomlConfig;
use parking_engine::domain::model::{ClientId, ParkingId};
use parking_engine::utils::error::ErrorSeverity;
use parking_engine::utils::{logger, validation::Validate};
use parking_engine::{CliConfig, ConfigProvider, ParkingEngine, ParkingError, RedbStore, Settings};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn dispatch(
    engine: &ParkingEngine<RedbStore>,
    command: Command,
    settings: &Settings,
) -> Result<serde_json::Value, ParkingError> {
    let value = match command {
        Command::Client { action } => match action {
            ClientCommand::Create(args) => {
                serde_json::to_value(engine.create_client(args.into())?)?
            }
            ClientCommand::Get { id } => {
                serde_json::to_value(engine.get_client(ClientId(id))?)?
            }
            ClientCommand::List => serde_json::to_value(engine.list_clients()?)?,
        },
        Command::Parking { action } => match action {
            ParkingCommand::Create(args) => {
                serde_json::to_value(engine.create_parking(args.into())?)?
            }
            ParkingCommand::Get { id } => {
                serde_json::to_value(engine.get_parking(ParkingId(id))?)?
            }
            ParkingCommand::List => serde_json::to_value(engine.list_parkings()?)?,
            ParkingCommand::Audit { id } => {
                serde_json::to_value(engine.audit_parking(ParkingId(id))?)?
            }
            ParkingCommand::Sessions { id } => {
                serde_json::to_value(engine.parking_sessions(ParkingId(id))?)?
            }
        },
        Command::Session { action } => match action {
            SessionCommand::Start(args) => {
                let (client_id, parking_id) = args.ids();
                serde_json::to_value(engine.start_session(client_id, parking_id)?)?
            }
            SessionCommand::Stop(args) => {
                let (client_id, parking_id) = args.ids();
                serde_json::to_value(engine.stop_session(client_id, parking_id)?)?
            }
            SessionCommand::History { client } => {
                serde_json::to_value(engine.session_history(ClientId(client))?)?
            }
        },
        Command::Simulate(args) => {
            let clients: Vec<ClientId> = args.clients.iter().copied().map(ClientId).collect();
            let report = simulate_arrivals(
                engine,
                ParkingId(args.parking),
                &clients,
                settings.concurrent_requests(),
            )
            .await?;
            serde_json::to_value(report)?
        }
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file_config = match &cli.config {
        Some(path) => Some(
            TomlConfig::from_file(path)
                .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        ),
        None => None,
    };
    if let Some(file_config) = &file_config {
        file_config.validate().context("Invalid configuration file")?;
    }

    let simulate_concurrency = match &cli.command {
        Command::Simulate(args) => args.concurrent_requests,
        _ => None,
    };
    let settings = Settings::resolve(
        cli.database.clone(),
        cli.json_logs,
        simulate_concurrency,
        file_config.as_ref(),
    );

    // 初始化日誌
    if settings.json_logs() {
        logger::init_json_logger(cli.verbose, settings.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, settings.log_level());
    }

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(3);
    }
    tracing::debug!("Settings: {:?}", settings);

    let store = RedbStore::open(settings.database_path()).with_context(|| {
        format!(
            "Failed to open database '{}'",
            settings.database_path().display()
        )
    })?;
    let engine = ParkingEngine::new(store);

    match dispatch(&engine, cli.command, &settings).await {
        Ok(value) => print_json(&value)?,
        Err(e) => {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::debug!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            print_json(&e.to_response())?;

            // 依錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::High => 1,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
