use daemonctl::cli::{output, Cli};

fn main() {
    daemonctl::logging::init();

    match Cli::run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}
