fn main() {
    if let Err(error) = sema_gateway::run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
