use std::env;
use std::fs;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use anyhow::Error;

use satisfy::{ProofFormat, Solver, SolverConfig};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("SATISFY_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is satisfy {}", env!("SATISFY_VERSION"));
    info!(
        "  {} build - {}",
        env!("SATISFY_PROFILE"),
        env!("SATISFY_RUSTC_VERSION")
    );
}

/// Installs a SIGUSR1 handler, returning the flag it sets.
///
/// Polled once per scheduling step so the dump happens at a safe checkpoint instead of
/// interrupting the solver mid-step.
fn install_progress_signal() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    if let Err(err) =
        signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&flag))
    {
        error!("Failed to install SIGUSR1 handler: {}", err);
    }
    flag
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("satisfy")
        .version(env!("SATISFY_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::VersionlessSubcommands)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg_from_usage("[proof-file] --proof=[FILE] 'Write a DRAT proof to the specified file'")
        .arg(
            Arg::from_usage(
                "[proof-format] --proof-format=[FORMAT] 'Specify the proof format to use.'",
            )
            .possible_values(&["drat", "binary-drat"])
            .default_value("drat")
            .case_insensitive(true),
        )
        .arg_from_usage("[max-conflicts] --max-conflicts=[N] 'Give up after N conflicts'")
        .arg_from_usage("[max-decisions] --max-decisions=[N] 'Give up after N decisions'")
        .arg_from_usage("[max-time] --max-time=[SECONDS] 'Give up after SECONDS of search'")
        .get_matches();

    init_logging();
    banner();

    let mut solver = Solver::new();

    solver.set_config(SolverConfig {
        max_conflicts: matches.value_of("max-conflicts").map(str::parse).transpose()?,
        max_decisions: matches.value_of("max-decisions").map(str::parse).transpose()?,
        max_time: matches
            .value_of("max-time")
            .map(str::parse)
            .transpose()?
            .map(std::time::Duration::from_secs_f64),
        ..SolverConfig::default()
    });

    let start = Instant::now();
    let progress_signal = install_progress_signal();

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn io::Read
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn io::Read
        }
    };

    if let Some(path) = matches.value_of("proof-file") {
        let proof_format_str = matches
            .value_of("proof-format")
            .unwrap()
            .to_ascii_lowercase();

        let proof_format = match &proof_format_str[..] {
            "drat" => ProofFormat::Drat,
            "binary-drat" => ProofFormat::BinaryDrat,
            _ => unreachable!(),
        };

        info!("Writing {} proof to file '{}'", proof_format_str, path);

        solver.write_proof(fs::File::create(path)?, proof_format);
    }

    solver.add_dimacs_cnf(file)?;

    let result = solver.solve_with_progress(&[], |progress| {
        if progress_signal.swap(false, Ordering::Relaxed) {
            eprintln!(
                "c t {:.1}s decisions {} props {} confl {} rest {} learned {} level {} trail {}",
                start.elapsed().as_secs_f64(),
                progress.decisions,
                progress.propagations,
                progress.conflicts,
                progress.restarts,
                progress.learned_clauses,
                progress.decision_level,
                progress.trail_len,
            );
        }
    });

    solver.close_proof();

    match result {
        Some(true) => {
            println!("s SATISFIABLE");
            print!("v");
            for l in solver.model().unwrap() {
                print!(" {}", l);
            }
            println!(" 0");
            Ok(10)
        }
        Some(false) => {
            println!("s UNSATISFIABLE");
            Ok(20)
        }
        None => {
            println!("s UNKNOWN");
            Ok(0)
        }
    }
}
