use proto_chain::{
    diagnostics::{emit_syntax_errors, report_io_error, report_runtime_error},
    language::parse_source,
    runtime::{Console, Interpreter},
    walkthrough,
};
use std::{env, fs, path::Path, process};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: ./proto-chain [demo | run <filename.proto>]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let status = match args.get(1).map(String::as_str) {
        Some("demo") if args.len() == 2 => run_demo(),
        Some("run") if args.len() == 3 => run_script(Path::new(&args[2])),
        _ => {
            eprintln!("{USAGE}");
            1
        }
    };
    process::exit(status);
}

fn run_demo() -> i32 {
    match walkthrough::run(&Console::stdout()) {
        Ok(()) => 0,
        Err(err) => {
            report_runtime_error(&err);
            1
        }
    }
}

fn run_script(path: &Path) -> i32 {
    if path.extension().and_then(|ext| ext.to_str()) != Some("proto") {
        eprintln!("Invalid file extension. Only .proto files are allowed.");
        eprintln!("{USAGE}");
        return 1;
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            report_io_error(path, &err);
            return 1;
        }
    };

    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(errs) => {
            emit_syntax_errors(path, &source, &errs);
            return 1;
        }
    };
    debug!(path = %path.display(), statements = program.statements.len(), "parsed script");

    let mut interpreter = Interpreter::new(Console::stdout());
    match interpreter.run(&program) {
        Ok(()) => 0,
        Err(err) => {
            report_runtime_error(&err);
            1
        }
    }
}
