fn main() {
    if let Err(err) = quarry_console::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
