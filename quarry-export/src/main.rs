fn main() {
    if let Err(err) = quarry_console::app::run_export() {
        eprintln!("export failed: {err}");
        std::process::exit(1);
    }
}
