use clap::{Parser, Subcommand};

/// authproxy: lets a sandboxed game log in without ever seeing the real token
#[derive(Parser)]
#[command(name = "authproxy", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy and run until interrupted
    Serve {
        /// Port to bind (overrides AUTHPROXY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the property overrides a launcher passes to the game
    Properties {
        /// Port the proxy will listen on (overrides AUTHPROXY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Print the routes and properties as JSON instead of -D arguments
        #[arg(long)]
        json: bool,
    },
}
