//! ChestKV CLI Client
//!
//! Command-line interface for interacting with ChestKV.

use chestkv::network::Client;
use chestkv::{ChestError, Scalar};
use clap::{Parser, Subcommand};

/// ChestKV CLI
#[derive(Parser, Debug)]
#[command(name = "chestkv-cli")]
#[command(about = "CLI for ChestKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7480")]
    server: String,

    /// Treat every value argument as a string instead of guessing its type
    #[arg(long, global = true)]
    string: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a scalar value
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Append values to a sequence
    Append {
        /// The sequence key
        key: String,

        /// Values to append, in order
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Add a member to a set
    Sadd {
        /// The set key
        key: String,

        /// The member to add
        member: String,
    },

    /// Check whether a member is in a set
    Sexists {
        /// The set key
        key: String,

        /// The member to look for
        member: String,
    },

    /// Ping the server
    Ping,

    /// Force the server to save a snapshot now
    Flush,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> chestkv::Result<()> {
    let mut client = Client::connect(&args.server)?;
    let parse = |token: &str| {
        if args.string {
            Scalar::Str(token.to_string())
        } else {
            Scalar::parse_lossy(token)
        }
    };

    match &args.command {
        Commands::Get { key } => {
            let value = client.get(key)?;
            println!("{}", value);
        }
        Commands::Set { key, value } => {
            client.set(key, parse(value))?;
            println!("OK");
        }
        Commands::Append { key, values } => {
            client.append(key, values.iter().map(|v| parse(v)))?;
            println!("OK");
        }
        Commands::Sadd { key, member } => {
            client.set_add(key, parse(member))?;
            println!("OK");
        }
        Commands::Sexists { key, member } => match client.set_exists(key, parse(member)) {
            Ok(()) => println!("true"),
            Err(ChestError::MemberNotFound { .. }) | Err(ChestError::KeyNotFound(_)) => {
                println!("false")
            }
            Err(e) => return Err(e),
        },
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
        Commands::Flush => {
            client.flush()?;
            println!("OK");
        }
    }

    Ok(())
}
