fn main() {
    if let Err(e) = pochade_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
