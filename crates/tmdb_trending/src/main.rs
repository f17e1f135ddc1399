use clap::Parser;

use tmdb_trending::config::CliArgs;

fn main() {
    let cli = CliArgs::parse();
    if let Err(err) = tmdb_trending::run(cli) {
        eprintln!("tmdb trending failed: {}", err);
        std::process::exit(1);
    }
}
