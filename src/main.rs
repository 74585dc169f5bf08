fn main() {
    if let Err(err) = bestie::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
