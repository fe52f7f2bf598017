use caldera::cli;
use log::error;

fn main() {
    let cli = cli::init();
    cli::run(cli).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
}
