use std::path::PathBuf;
use std::process::exit;

use anyhow::Context;
use clap::Parser;

use torrone::engines::AspEngine;
use torrone::engines::CircumscriptionEngine;
use torrone::engines::EngineAnswer;
use torrone::engines::MaxSatEngine;
use torrone::engines::SatEngine;
use torrone::options::EngineOptions;
use torrone::options::QueryStrategy;
use torrone::options::SolverOptions;
use torrone::parse::open_reader;
use torrone::parse::read_prolog;
use torrone::parse::ProgramIdentifier;
use torrone::parse::StreamBuffer;
use torrone::statistics::configure_statistics;

/// Boolean reasoning engines on a CDCL core: satisfiability, MaxSAT, answer
/// sets and circumscription, selected by the input's prolog line.
#[derive(Debug, Parser)]
#[command(name = "torrone", version)]
struct Cli {
    /// The input program; standard input when omitted. Gzip-compressed
    /// input is detected automatically.
    input: Option<PathBuf>,

    /// Shorthand for `--models`.
    n: Option<u64>,

    /// How many models (or top-k optima) to produce; 0 means all.
    #[arg(short = 'n', long = "models", default_value_t = 1)]
    models: u64,

    /// Suppress the model lines.
    #[arg(long)]
    no_model: bool,

    /// Witnesses to enumerate per circumscription answer; 0 means
    /// unbounded.
    #[arg(long, default_value_t = 1)]
    witnesses: u64,

    /// How circumscription queries are answered.
    #[arg(long, value_enum, default_value_t)]
    query_strategy: QueryStrategy,

    /// Seed of the solver's random generator.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print solver statistics as comment lines.
    #[arg(long)]
    statistics: bool,
}

fn run() -> anyhow::Result<i32> {
    env_logger::init();
    let cli = Cli::parse();
    configure_statistics(cli.statistics, "c ");

    let reader = open_reader(cli.input.as_deref()).with_context(|| {
        match &cli.input {
            Some(path) => format!("cannot open {}", path.display()),
            None => "cannot open standard input".to_owned(),
        }
    })?;
    let mut stream = StreamBuffer::new(reader)?;
    let prolog = read_prolog(&mut stream)?;

    let solver_options = SolverOptions::with_seed(cli.seed);
    let engine_options = EngineOptions {
        max_models: cli.n.unwrap_or(cli.models),
        print_model: !cli.no_model,
        witnesses: cli.witnesses,
        query_strategy: cli.query_strategy,
    };

    let answer: EngineAnswer = match prolog.identifier {
        ProgramIdentifier::Cnf => {
            let mut engine = SatEngine::new(solver_options, engine_options);
            register_interrupt(engine.interrupt_flag())?;
            engine.load(&mut stream, &prolog)?;
            engine.solve()
        }
        ProgramIdentifier::Wcnf => {
            let mut engine = MaxSatEngine::new(solver_options, engine_options);
            register_interrupt(engine.interrupt_flag())?;
            engine.load(&mut stream, &prolog)?;
            engine.solve()
        }
        ProgramIdentifier::Asp => {
            let mut engine = AspEngine::new(solver_options, engine_options);
            register_interrupt(engine.interrupt_flag())?;
            engine.load(&mut stream, &prolog)?;
            engine.solve()
        }
        ProgramIdentifier::Circumscription => {
            let mut engine = CircumscriptionEngine::new(solver_options, engine_options);
            register_interrupt(engine.interrupt_flag())?;
            engine.load(&mut stream, &prolog)?;
            engine.solve()
        }
    };

    Ok(answer.exit_code())
}

fn register_interrupt(
    flag: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> anyhow::Result<()> {
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, flag)
        .context("cannot register the interrupt handler")?;
    Ok(())
}

fn main() {
    match run() {
        Ok(code) => exit(code),
        Err(error) => {
            eprintln!("{error:#}");
            exit(3);
        }
    }
}
