use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use sot_bridge_core::backend::domain::session_config::SessionConfig;
use sot_bridge_core::backend::infrastructure::process_backend_session::ProcessBackendSession;
use sot_bridge_core::pipeline::convert_use_case::{ConversionError, ConvertUseCase, TargetFormat};
use sot_bridge_core::pipeline::transcribe_audio_use_case::{Protocol, TranscribeAudioUseCase};
use sot_bridge_core::shared::constants::DEFAULT_BACKEND_EXECUTABLE;
use sot_bridge_core::transcription::domain::transcription_options::TranscriptionOptions;

/// Bridge between the legacy SOT protocol and the JSON transcription interface.
#[derive(Parser)]
#[command(name = "sot-bridge", version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert SOT-framed data to a JSON request or back.
    Convert(ConvertArgs),
    /// Send audio to a transcription backend process.
    Transcribe(TranscribeArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file (reads stdin if omitted).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (writes stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json or sot.
    #[arg(short, long, default_value = "json")]
    format: TargetFormat,

    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Args)]
struct TranscribeArgs {
    /// Model file passed to the backend.
    #[arg(short, long)]
    model: PathBuf,

    /// Backend executable.
    #[arg(long, default_value = DEFAULT_BACKEND_EXECUTABLE)]
    backend: PathBuf,

    /// Audio, SOT-framed or JSON request file (reads stdin if omitted).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Protocol used with the backend: json or sot.
    #[arg(short, long, default_value = "json")]
    protocol: Protocol,

    /// JSON file with backend session settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads for the backend.
    #[arg(long)]
    threads: Option<u32>,

    /// Disable hardware acceleration in the backend.
    #[arg(long)]
    cpu_only: bool,

    #[command(flatten)]
    options: OptionArgs,
}

/// Transcription options; only flags that are given end up in the request.
#[derive(Args)]
struct OptionArgs {
    /// Language code (e.g. en, es, fr).
    #[arg(short, long)]
    language: Option<String>,

    /// Include timestamps in the output.
    #[arg(short, long, conflicts_with = "no_timestamps")]
    timestamps: bool,

    /// Don't include timestamps.
    #[arg(long)]
    no_timestamps: bool,

    /// Sampling temperature (0.0-1.0).
    #[arg(long)]
    temperature: Option<f32>,
}

impl OptionArgs {
    fn to_options(&self) -> Option<TranscriptionOptions> {
        let mut options = TranscriptionOptions::default();
        if let Some(language) = &self.language {
            options = options.with_language(language.clone());
        }
        if self.timestamps {
            options = options.with_include_timestamps(true);
        } else if self.no_timestamps {
            options = options.with_include_timestamps(false);
        }
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        (!options.is_empty()).then_some(options)
    }
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Convert(args) => run_convert(args),
        Command::Transcribe(args) => run_transcribe(args),
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = args.options.to_options();
    if let Some(options) = &options {
        options.validate()?;
    }

    let use_case = ConvertUseCase::new(args.format, options);
    let result = match (&args.input, &args.output) {
        (Some(input), Some(output)) => use_case.convert_file(input, output),
        (input, output) => convert_streams(&use_case, input.as_deref(), output.as_deref()),
    };

    result.map_err(|e| format!("{} stage failed: {e}", e.stage()).into())
}

fn convert_streams(
    use_case: &ConvertUseCase,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), ConversionError> {
    let data = read_input(input).map_err(|e| ConversionError::Read {
        source_name: input.map_or("stdin".to_string(), |p| p.display().to_string()),
        source: e,
    })?;

    write_converted(use_case, &data, output)
}

fn write_converted(
    use_case: &ConvertUseCase,
    data: &[u8],
    output: Option<&Path>,
) -> Result<(), ConversionError> {
    match output {
        Some(path) => use_case.convert_to_file(data, path),
        None => use_case.convert_stream(&mut &data[..], &mut io::stdout().lock()),
    }
}

fn run_transcribe(args: TranscribeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.cpu_only {
        config.cpu_only = true;
    }

    let audio = read_input(args.input.as_deref())?;

    let mut session = ProcessBackendSession::new(&args.backend);
    session.start(&args.model, &config)?;
    if let Some(name) = session.model_name() {
        log::info!("Using model {name}");
    }

    let mut use_case =
        TranscribeAudioUseCase::new(Box::new(session), args.protocol, args.options.to_options());
    let result = use_case.execute(&audio)?;

    let mut stdout = io::stdout().lock();
    match args.protocol {
        Protocol::Legacy => writeln!(stdout, "{}", result.text)?,
        Protocol::Json => writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?,
    }
    stdout.flush()?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path),
        None => {
            let mut buffer = Vec::new();
            io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}
