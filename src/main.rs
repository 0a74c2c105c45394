use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use dan_calc::plot::{sample_curve, SampleRange};
use dan_calc::{evaluate, PlotError};
use log::{error, info};

enum Command {
    Interactive,
    Evaluate(String),
    Plot { expression: String, range: SampleRange },
    Help,
    Version,
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            let _ = write_usage_error(&mut io::stderr().lock(), &message);
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            let _ = write_usage(&mut io::stdout().lock());
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("dan-calc {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Command::Evaluate(expression) => run_evaluate(&expression),
        Command::Plot { expression, range } => run_plot(&expression, &range),
        Command::Interactive => match run_interactive() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Input error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut expression = None;
    let mut plot = None;
    let mut from = None;
    let mut to = None;
    let mut step = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-e" | "--expression" => expression = Some(value_of(arg, iter.next())?),
            "-p" | "--plot" => plot = Some(value_of(arg, iter.next())?),
            "--from" => from = Some(number_of(arg, iter.next())?),
            "--to" => to = Some(number_of(arg, iter.next())?),
            "--step" => step = Some(number_of(arg, iter.next())?),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    match (expression, plot) {
        (Some(_), Some(_)) => Err("--expression and --plot cannot be combined".to_string()),
        (Some(expression), None) => Ok(Command::Evaluate(expression)),
        (None, Some(expression)) => {
            let defaults = SampleRange::default();
            let range = SampleRange::new(
                from.unwrap_or(defaults.start()),
                to.unwrap_or(defaults.end()),
                step.unwrap_or(defaults.step()),
            )
            .map_err(|e| e.to_string())?;
            Ok(Command::Plot { expression, range })
        }
        (None, None) if from.is_some() || to.is_some() || step.is_some() => {
            Err("--from, --to and --step require --plot".to_string())
        }
        (None, None) => Ok(Command::Interactive),
    }
}

fn value_of(flag: &str, value: Option<&String>) -> Result<String, String> {
    value
        .cloned()
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn number_of(flag: &str, value: Option<&String>) -> Result<f64, String> {
    let text = value_of(flag, value)?;
    // Range bounds are themselves arithmetic, so "-2^3" or "1/8" work.
    evaluate(&text).map_err(|e| format!("invalid value for {}: {}", flag, e))
}

fn run_evaluate(expression: &str) -> ExitCode {
    match evaluate(expression) {
        Ok(result) => {
            println!("{}", result);
            info!("CLI evaluation: {} = {}", expression, result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("CLI evaluation error for {}: {}", expression, e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_plot(expression: &str, range: &SampleRange) -> ExitCode {
    let curve = match sample_curve(expression, range) {
        Ok(curve) => curve,
        Err(e) => {
            report_plot_error(expression, &e);
            return ExitCode::FAILURE;
        }
    };

    match curve.write_csv(io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to write samples: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report_plot_error(expression: &str, e: &PlotError) {
    match e {
        PlotError::Sample { x, .. } => {
            error!("Graphing error for {} at x={}: {}", expression, x, e)
        }
        _ => error!("Graphing error for {}: {}", expression, e),
    }
    eprintln!("Error: {}", e);
}

/// Line-by-line calculator: each line is evaluated on its own.
fn run_interactive() -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("dan-calc: type an expression and press Enter; 'quit' exits.");

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            expression => match evaluate(expression) {
                Ok(result) => {
                    info!("Evaluated: {} = {}", expression, result);
                    writeln!(stdout, "{}", result)?;
                }
                Err(e) => {
                    error!("Evaluation error for {}: {}", expression, e);
                    writeln!(stdout, "Error: {}", e)?;
                }
            },
        }
    }

    Ok(())
}

const USAGE: &str = "\
dan-calc - safe arithmetic calculator

USAGE:
    dan-calc                              Interactive calculator on stdin
    dan-calc --expression <EXPR>          Evaluate one expression and exit
    dan-calc --plot <EXPR> [RANGE]        Print y = EXPR sampled over x as CSV

RANGE:
    --from <A>     First x value (default -10)
    --to <B>       Last x value (default 10)
    --step <S>     Distance between samples (default 0.1)

OPTIONS:
    -h, --help       Print help information
    -V, --version    Print version information

Expressions use numbers, variables, + - * /, ^ (or **) and unary minus.
Set RUST_LOG=debug for evaluation traces.
";

fn write_usage(out: &mut impl Write) -> io::Result<()> {
    out.write_all(USAGE.as_bytes())
}

/// Argument errors go to stderr together with the usage text.
fn write_usage_error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "Error: {}", message)?;
    writeln!(out)?;
    write_usage(out)
}
