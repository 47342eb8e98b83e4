use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "qa-setup")]
#[command(version)]
#[command(about = "Register and deploy a question-answering model on a local OpenSearch cluster", long_about = None)]
struct Cli {
    /// Path to a JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cluster URL (default: http://localhost:9200)
    #[arg(long)]
    base_url: Option<String>,
}

fn main() {
    qa_setup_lib::logging::init();

    let cli = Cli::parse();

    match qa_setup_lib::run(cli.config.as_deref(), cli.base_url) {
        Ok(model_id) => println!("Setup completed successfully. Model ID: {}", model_id),
        Err(e) => {
            eprintln!("Error during setup: {}", e);
            std::process::exit(1);
        }
    }
}
