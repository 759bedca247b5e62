//! skiff - deployment lifecycle runner

use clap::Parser;

use skiff_cli::cli::Cli;
use skiff_cli::domain::DeployError;
use skiff_cli::output::json::format_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = cli.run().await {
        if json {
            let code = e.downcast_ref::<DeployError>().map_or("error", DeployError::code);
            match format_error(&format!("{e:#}"), code) {
                Ok(out) => println!("{out}"),
                Err(_) => eprintln!("Error: {e:#}"),
            }
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
