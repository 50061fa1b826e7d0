fn main() {
    if let Err(err) = cashflow_normalize::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
