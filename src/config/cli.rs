use crate::domain::model::{ClientId, NewClient, NewParking, ParkingId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "parking-engine")]
#[command(about = "Parking facilities, clients and check-in/check-out sessions")]
pub struct CliConfig {
    /// Path to the redb database file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register and look up clients
    Client {
        #[command(subcommand)]
        action: ClientCommand,
    },
    /// Register and look up parkings
    Parking {
        #[command(subcommand)]
        action: ParkingCommand,
    },
    /// Check clients in and out
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },
    /// Fire concurrent check-ins at one parking
    Simulate(SimulateArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClientCommand {
    Create(CreateClientArgs),
    Get { id: u64 },
    List,
}

#[derive(Debug, Clone, Args)]
pub struct CreateClientArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub surname: Option<String>,
    #[arg(long)]
    pub credit_card: Option<String>,
    #[arg(long)]
    pub car_number: Option<String>,
}

impl From<CreateClientArgs> for NewClient {
    fn from(args: CreateClientArgs) -> Self {
        Self {
            name: args.name,
            surname: args.surname,
            credit_card: args.credit_card,
            car_number: args.car_number,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum ParkingCommand {
    Create(CreateParkingArgs),
    Get { id: u64 },
    List,
    /// Compare the stored counter with the open-session count
    Audit { id: u64 },
    /// Sessions recorded at a parking, newest first
    Sessions { id: u64 },
}

#[derive(Debug, Clone, Args)]
pub struct CreateParkingArgs {
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub count_places: Option<u32>,
    #[arg(long)]
    pub count_available_places: Option<u32>,
    /// Defaults to true when omitted
    #[arg(long)]
    pub opened: Option<bool>,
}

impl From<CreateParkingArgs> for NewParking {
    fn from(args: CreateParkingArgs) -> Self {
        Self {
            address: args.address,
            count_places: args.count_places,
            count_available_places: args.count_available_places,
            opened: args.opened,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum SessionCommand {
    Start(SessionArgs),
    Stop(SessionArgs),
    /// Sessions of a client, newest first
    History {
        #[arg(long)]
        client: u64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[arg(long)]
    pub client: u64,
    #[arg(long)]
    pub parking: u64,
}

impl SessionArgs {
    pub fn ids(&self) -> (ClientId, ParkingId) {
        (ClientId(self.client), ParkingId(self.parking))
    }
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    #[arg(long)]
    pub parking: u64,

    #[arg(long, value_delimiter = ',', required = true)]
    pub clients: Vec<u64>,

    #[arg(long)]
    pub concurrent_requests: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_start() {
        let cli = CliConfig::try_parse_from([
            "parking-engine",
            "--database",
            "/tmp/p.redb",
            "session",
            "start",
            "--client",
            "4",
            "--parking",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/p.redb")));
        match cli.command {
            Command::Session {
                action: SessionCommand::Start(args),
            } => assert_eq!(args.ids(), (ClientId(4), ParkingId(2))),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parking_opened_flag_is_optional() {
        let cli = CliConfig::try_parse_from([
            "parking-engine",
            "parking",
            "create",
            "--address",
            "ул.Ленина, 1",
            "--count-places",
            "10",
            "--count-available-places",
            "10",
        ])
        .unwrap();

        match cli.command {
            Command::Parking {
                action: ParkingCommand::Create(args),
            } => assert_eq!(NewParking::from(args).opened, None),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_simulate_client_list() {
        let cli = CliConfig::try_parse_from([
            "parking-engine",
            "simulate",
            "--parking",
            "1",
            "--clients",
            "1,2,3",
        ])
        .unwrap();

        match cli.command {
            Command::Simulate(args) => assert_eq!(args.clients, vec![1, 2, 3]),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
