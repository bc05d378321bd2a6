fn main() {
    if let Err(err) = tidytab::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
