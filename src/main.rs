mod bridge;
mod chat;
mod config;
mod constants;
mod error;
mod extract;
mod images;
mod normalize;
mod persist;
mod print_help;
mod reference;
mod server;
mod tools;
mod utils;
mod vision;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::constants::CMD_SERVE;
use crate::print_help::print_help;
use crate::utils::process_command;
use std::{env, error::Error};
use tokio::io::{stdin, stdout, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.iter().any(|arg| arg == "-help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    let bridge = Bridge::new(Config::from_env()?)?;
    if args[1] == CMD_SERVE {
        server::serve(&bridge, BufReader::new(stdin()), stdout()).await?;
        return Ok(());
    }

    process_command(&bridge, &args).await?;
    Ok(())
}
