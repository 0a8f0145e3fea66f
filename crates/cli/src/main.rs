fn main() {
    annotator_cli::init_logging();

    if let Err(error) = annotator_cli::run(std::env::args_os()) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
