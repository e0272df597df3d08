use clap::Parser;

fn main() {
    let cli = stepdeckctl::Cli::parse();
    if let Err(err) = stepdeckctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
