mod config;
mod http;
mod middleware;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use platform_authz::{Role, role_permissions};
use platform_obs::{ObsConfig, init_tracing};

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "dashboard-server", version, about = "Multi-tenant dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Print the route permission declarations.
    Routes,
    /// Print the role to permission map.
    Roles,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Routes => {
            print_routes();
            Ok(())
        }
        Command::Roles => {
            print_roles();
            Ok(())
        }
    }
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let state = AppState::from_config(config)?;
    http::serve(cmd.into(), state).await
}

fn print_routes() {
    let pipeline = routes::dashboard_pipeline();
    let config = pipeline.config();
    println!("sign-in   {}", config.sign_in_path);
    println!("sign-up   {}", config.sign_up_path);
    println!("landing   {}", config.landing_path);
    println!("forbidden {}", config.forbidden_path);
    for rule in &config.public {
        println!("public    {rule:?}");
    }
    for (prefix, required) in pipeline.routes().iter() {
        let names: Vec<&str> = required.iter().map(|perm| perm.as_str()).collect();
        println!("{prefix:<28} any of [{}]", names.join(", "));
    }
}

fn print_roles() {
    for role in Role::all() {
        let names: Vec<&str> = role_permissions(*role)
            .iter()
            .map(|perm| perm.as_str())
            .collect();
        println!("{:<8} {}", role.as_str(), names.join(" "));
    }
}
