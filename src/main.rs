use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = review_notes::app::Cli::parse();
    if let Err(err) = review_notes::run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
