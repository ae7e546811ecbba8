//! bstride: print selected parts of fixed or variable length binary records.
//!
//! Usage: bstride [OPTIONS] [FILE]...

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use binops::config::{output_buffer_size, StreamConfig};
use binops::error::{BinopsError, Result};
use binops::input::stdin_or_each;
use binops::pattern;
use binops::range::{parse_integer, ByteRange};
use binops::records::{Filter, Limit, Vlen, Width};
use binops::view::{parse_fields, parse_unpack, WriteOp};

/// Record width used when neither -w nor -v is given.
const DEFAULT_WIDTH: u64 = 16;

#[derive(Parser)]
#[command(name = "bstride")]
#[command(version)]
#[command(about = "Walk binary input as a sequence of records and print parts of each", long_about = None)]
struct Cli {
    /// Fixed record width in bytes
    #[arg(short = 'w', long, value_parser = parse_width, conflicts_with = "vlen")]
    width: Option<u64>,

    /// Variable record length: N..M[:DIRECTIVE=C]+EXTRA_BYTES
    #[arg(short = 'v', long, value_parser = Vlen::parse)]
    vlen: Option<Vlen>,

    /// Offset of the first record in every input
    #[arg(short = 's', long, value_parser = parse_non_negative, default_value = "0")]
    skip: u64,

    /// Maximum number of records to print across all inputs
    #[arg(short = 'c', long, value_parser = parse_non_negative)]
    count: Option<u64>,

    /// Only print records matching: N..M[:DIRECTIVE=C][&HEXMASK]{==,!=,<,<=,>,>=}INTEGER
    /// (repeatable, any filter may match)
    #[arg(short = 'F', long = "filter", value_parser = Filter::parse, allow_hyphen_values = true)]
    filters: Vec<Filter>,

    /// Copy the raw bytes of ranges: N,N..M,...
    #[arg(short = 'f', long, allow_hyphen_values = true)]
    fields: Vec<String>,

    /// Decode and print ranges: N,N..M,...[:DIRECTIVE=C*][?FORMAT=%02x]
    #[arg(short = 'u', long, allow_hyphen_values = true)]
    unpack: Vec<String>,

    /// Write literal text
    #[arg(short = 't', long, allow_hyphen_values = true)]
    text: Vec<String>,

    /// Write packed integers: N,N..M,...[:DIRECTIVE=C][^REPEAT]
    #[arg(short = 'p', long)]
    pack: Vec<String>,

    /// Use smaller buffers
    #[arg(long)]
    low_memory: bool,

    /// Input files (use - for stdin; stdin when none are given)
    inputs: Vec<PathBuf>,
}

fn parse_non_negative(token: &str) -> Result<u64> {
    let n = parse_integer(token).ok_or_else(|| BinopsError::NotANumber(token.to_string()))?;
    u64::try_from(n).map_err(|_| BinopsError::NotPositive(token.to_string()))
}

fn parse_width(token: &str) -> Result<u64> {
    let width = parse_non_negative(token)?;
    Width::fixed(width)?;
    Ok(width)
}

fn parse_text(token: &str) -> Result<Vec<WriteOp>> {
    Ok(vec![WriteOp::Literal(token.as_bytes().to_vec())])
}

fn parse_pack(token: &str) -> Result<Vec<WriteOp>> {
    Ok(vec![WriteOp::Literal(pattern::generate(token)?)])
}

/// Output ops of all kinds, in command-line order.
fn write_script(matches: &ArgMatches) -> Result<Vec<WriteOp>> {
    type Parse = fn(&str) -> Result<Vec<WriteOp>>;
    let kinds: [(&str, Parse); 4] = [
        ("fields", parse_fields),
        ("unpack", parse_unpack),
        ("text", parse_text),
        ("pack", parse_pack),
    ];

    let mut steps = Vec::new();
    for (id, parse) in kinds {
        let (Some(values), Some(indices)) = (matches.get_many::<String>(id), matches.indices_of(id)) else {
            continue;
        };
        for (value, index) in values.zip(indices) {
            steps.push((index, parse(value)?));
        }
    }
    steps.sort_by_key(|(index, _)| *index);

    let ops: Vec<WriteOp> = steps.into_iter().flat_map(|(_, ops)| ops).collect();
    if ops.is_empty() {
        return Ok(vec![WriteOp::CopyRange(ByteRange::all())]);
    }
    Ok(ops)
}

fn run(cli: Cli, matches: &ArgMatches) -> Result<()> {
    let ops = write_script(matches)?;
    let width = match cli.vlen {
        Some(vlen) => Width::Variable(vlen),
        None => Width::fixed(cli.width.unwrap_or(DEFAULT_WIDTH))?,
    };
    let mut limit = Limit::new(cli.count);

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(output_buffer_size(cli.low_memory), stdout.lock());

    stdin_or_each(&cli.inputs, StreamConfig::for_memory(cli.low_memory), |_, stream| {
        if limit.is_exhausted() {
            return Ok(());
        }
        stream
            .each_record_filtered(width, cli.skip, &cli.filters, &mut limit)
            .try_for_each(|record| {
                record.scripted_write(&mut out, &ops)?;
                Ok(())
            })?;
        Ok(())
    })?;

    out.flush()?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    match run(cli, &matches) {
        Ok(()) => {}
        // Reader went away (e.g. piped into head)
        Err(BinopsError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
