fn main() {
    if let Err(err) = spirit_companion_lib::run() {
        log::error!("fatal: {err:#}");
        eprintln!("spirit-companion: {err:#}");
        std::process::exit(1);
    }
}
