//! MRISC toolchain CLI.
//!
//! This binary provides the two toolchain entry points:
//! 1. **assemble:** Two-pass assembly of a source file into a machine image
//!    (`words` or `records` text format, profile-selectable).
//! 2. **run:** Deterministic execution of a source file or machine image to
//!    halt or step-budget exhaustion, reporting final registers, flags, and
//!    the word at the dump address.
//!
//! Exit code 0 on success; 1 with the full diagnostic list on any parse,
//! encode, or runtime error.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mrisc_core::config::DEFAULT_MAX_STEPS;
use mrisc_core::sim::loader;
use mrisc_core::{assemble, Cpu, EngineConfig, ImageFormat, Profile, RunSummary};

#[derive(Parser, Debug)]
#[command(
    name = "mrisc",
    author,
    version,
    about = "Assembler and deterministic emulator for the MRISC instruction sets",
    long_about = "Assemble symbolic assembly into machine images, or execute a program \
                  (source or image) against the register/flag/memory model.\n\nExamples:\n  \
                  mrisc assemble program.asm program.hex\n  \
                  mrisc assemble rom.asm rom.hex --profile 8bit\n  \
                  mrisc run program.asm --max-steps 100000 --dump-addr 0x2000\n  \
                  mrisc run program.hex --trace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Instruction-set selection.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    /// 32-bit fixed-width ISA (default).
    #[value(name = "32bit")]
    Bit32,
    /// 8-bit variable-width ISA (assemble only).
    #[value(name = "8bit")]
    Bit8,
}

impl ProfileArg {
    fn profile(self) -> Profile {
        match self {
            Self::Bit32 => Profile::bit32(),
            Self::Bit8 => Profile::bit8(),
        }
    }
}

/// Machine-image text format selection.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    /// One hex word per line.
    Words,
    /// 16-byte `:ADDR ..` records.
    Records,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a source file into a machine image.
    Assemble {
        /// Assembly source file.
        input: PathBuf,

        /// Output image file.
        output: PathBuf,

        /// Instruction-set profile.
        #[arg(long, value_enum, default_value = "32bit")]
        profile: ProfileArg,

        /// Image text format (default: words for 32bit, records for 8bit).
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Execute a program (assembly source or .hex image) to halt or budget.
    Run {
        /// Program file: assembly source, or a machine image if `.hex`.
        program: PathBuf,

        /// Step budget before the run is declared non-terminating.
        #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
        max_steps: u64,

        /// Trace each executed instruction to stderr.
        #[arg(long)]
        trace: bool,

        /// Word address to report after execution.
        #[arg(long, value_parser = parse_addr, default_value = "0x2000")]
        dump_addr: u32,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Parses a `--dump-addr` value (decimal or 0x hex).
fn parse_addr(text: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|_| format!("invalid address '{text}'"))
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Assemble {
            input,
            output,
            profile,
            format,
        } => cmd_assemble(&input, &output, profile, format),
        Commands::Run {
            program,
            max_steps,
            trace,
            dump_addr,
            json,
        } => cmd_run(&program, max_steps, trace, dump_addr, json),
    }
}

/// Assembles `input` into `output`, printing every diagnostic on failure.
fn cmd_assemble(input: &PathBuf, output: &PathBuf, profile: ProfileArg, format: Option<FormatArg>) {
    let profile = profile.profile();
    if let Err(e) = profile.validate() {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let source = match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let image = match assemble(&profile, &source) {
        Ok(image) => image,
        Err(report) => {
            for err in &report.errors {
                eprintln!("error: {err}");
            }
            eprintln!("assembly failed: {} error(s)", report.errors.len());
            process::exit(1);
        }
    };

    let format = match (format, profile.word_size) {
        (Some(FormatArg::Words), _) => ImageFormat::Words,
        (Some(FormatArg::Records), _) => ImageFormat::Records,
        (None, 4) => ImageFormat::Words,
        (None, _) => ImageFormat::Records,
    };

    if let Err(e) = std::fs::write(output, image.render(format)) {
        eprintln!("error: cannot write '{}': {e}", output.display());
        process::exit(1);
    }
    println!(
        "assembled {} byte(s) -> {} ({format})",
        image.len(),
        output.display()
    );
}

/// Executes `program` and prints the final state summary.
fn cmd_run(program: &PathBuf, max_steps: u64, trace: bool, dump_addr: u32, json: bool) {
    if trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mrisc_core=trace")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let profile = Profile::bit32();
    let config = EngineConfig {
        max_steps,
        trace,
        dump_addr,
        ..EngineConfig::default()
    };

    let loaded = match loader::load_program(&profile, program) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let mut cpu = Cpu::new(&profile, loaded, &config);
    let result = cpu.run(config.max_steps);
    let summary = RunSummary::collect(&cpu, config.dump_addr);

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("error: cannot serialize summary: {e}"),
        }
    } else {
        println!("{summary}");
    }

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
