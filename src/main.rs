use clap::Parser;
use retireplan::api::{Cli, Command, SimulationSettings, run_http_server, run_project};

#[tokio::main]
async fn main() {
    env_logger::init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project {
            input,
            trials,
            volatility,
            seed,
            csv,
        } => {
            let settings = SimulationSettings {
                trials,
                volatility,
                seed,
            };
            match run_project(&input, settings, csv.as_deref()) {
                Ok(report) => println!("{report}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
