use bloom_kstar::{
    AdaptiveSearch, BloomError, CsvSink, RecordSink, SearchConfigBuilder,
    SweepBuilder, TracingObserver, TrialRecord, theoretical_fp_prob,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a fixed band of hash counts around the theoretical optimum
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of hash counts to measure
        #[arg(long, default_value = "10")]
        points: usize,

        /// Passes over the band, each with a different key stream
        #[arg(long, default_value = "1")]
        repeats: usize,
    },

    /// Search for the hash count with the lowest empirical false positive rate
    Search {
        #[command(flatten)]
        common: CommonArgs,

        /// Smallest hash count to consider
        #[arg(long, default_value = "1")]
        k_min: usize,

        /// Largest hash count to consider
        #[arg(long, default_value = "100")]
        k_max: usize,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Filter size in bits
    #[arg(short, long, default_value = "50000")]
    m: usize,

    /// Number of inserted keys
    #[arg(short, long, default_value = "45000")]
    n: usize,

    /// True-negative probes per measurement
    #[arg(short, long, default_value = "500000")]
    queries: usize,

    /// Seed of the first hash mixer
    #[arg(long, default_value = "12345")]
    seed1: u64,

    /// Seed of the second hash mixer
    #[arg(long, default_value = "67890")]
    seed2: u64,

    /// Output file; records go to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

/// One JSON object per line.
struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn record(&mut self, rec: &TrialRecord) -> bloom_kstar::Result<()> {
        serde_json::to_writer(&mut self.writer, rec)
            .map_err(|e| BloomError::Serialization(e.to_string()))?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> bloom_kstar::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            Ok(Box::new(BufWriter::new(File::create(path)?)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

fn make_sink(common: &CommonArgs) -> io::Result<Box<dyn RecordSink>> {
    let writer = open_output(common.output.as_deref())?;
    let sink: Box<dyn RecordSink> = match common.format {
        Format::Csv => Box::new(CsvSink::new(writer)),
        Format::Json => Box::new(JsonLinesSink { writer }),
    };
    Ok(sink)
}

fn results_table(records: &[TrialRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("k").set_alignment(CellAlignment::Center),
            Cell::new("Empirical FPR").set_alignment(CellAlignment::Center),
            Cell::new("Theoretical FPR").set_alignment(CellAlignment::Center),
            Cell::new("Deviation").set_alignment(CellAlignment::Center),
        ]);

    for rec in records {
        table.add_row(vec![
            Cell::new(format!("{}", rec.k)),
            Cell::new(format!("{:.6}", rec.empirical_fp)),
            Cell::new(format!("{:.6}", rec.theoretical_fp)),
            Cell::new(format!("{:+.6}", rec.empirical_fp - rec.theoretical_fp)),
        ]);
    }
    table
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep {
            common,
            points,
            repeats,
        } => {
            let sweep = SweepBuilder::default()
                .m(common.m)
                .n(common.n)
                .queries(common.queries)
                .points(points)
                .repeats(repeats)
                .seed1(common.seed1)
                .seed2(common.seed2)
                .build()?;

            let mut sink = make_sink(&common)?;
            let records = sweep.run_with(&TracingObserver, sink.as_mut())?;
            sink.finish()?;

            eprintln!("{}", results_table(&records));
            eprintln!("theoretical k* = {}", sweep.k_star());
        }
        Commands::Search {
            common,
            k_min,
            k_max,
        } => {
            let config = SearchConfigBuilder::default()
                .m(common.m)
                .n(common.n)
                .k_min(k_min)
                .k_max(k_max)
                .queries(common.queries)
                .seed1(common.seed1)
                .seed2(common.seed2)
                .build()?;

            let mut records: Vec<TrialRecord> = Vec::new();
            let mut sink = make_sink(&common)?;
            let outcome = {
                let mut tee = Tee {
                    first: sink.as_mut(),
                    second: &mut records,
                };
                AdaptiveSearch::new(config)?
                    .run_with(&TracingObserver, &mut tee)?
            };
            sink.finish()?;

            eprintln!("{}", results_table(&records));
            eprintln!(
                "best k = {} (fp = {:.6}, theoretical fp = {:.6})",
                outcome.best_k,
                outcome.best_rate,
                theoretical_fp_prob(common.m, common.n, outcome.best_k),
            );
            eprintln!(
                "theoretical k* = {}, rounds = {}",
                outcome.k_star,
                outcome.rounds.len()
            );
        }
    }

    Ok(())
}

/// Sends each record to two sinks.
struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: RecordSink, B: RecordSink> RecordSink for Tee<A, B> {
    fn record(&mut self, rec: &TrialRecord) -> bloom_kstar::Result<()> {
        self.first.record(rec)?;
        self.second.record(rec)
    }

    fn finish(&mut self) -> bloom_kstar::Result<()> {
        self.first.finish()?;
        self.second.finish()
    }
}
