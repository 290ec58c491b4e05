use clap::Parser;
use postkid::cli::Parameters;

#[tokio::main]
async fn main() {
    env_logger::init();

    let params = Parameters::parse();
    if let Err(err) = postkid::runner::run(&params).await {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
