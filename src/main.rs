fn main() {
    if handle_cli_flags() {
        return;
    }

    let invocation = match cellophane::app::parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(err) => {
            eprintln!("error: {err}\n\n{}", cellophane::app::USAGE);
            std::process::exit(2);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = cellophane::run(invocation, &mut out) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Cellophane {}", cellophane::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!("{}", cellophane::app::USAGE);
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
