use clap::Parser;

use homecost::api::{Cli, Command, run_http_server, run_project_command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    homecost::log::init_logging(cli.verbose);

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(args) => match run_project_command(args) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}
