// ABOUTME: Entry point for the enginewire CLI application.
// ABOUTME: Parses arguments and dispatches to the decoding sessions.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use enginewire::config::Config;
use enginewire::error::{Error, Result};
use enginewire::mapping::{Direction, ModelMapper, Table};
use enginewire::stream::{
    ChunkBody, ChunkedJsonDecoder, ContentType, DecodeError, DecodeOptions, StreamDemuxer,
};
use serde_json::Value;
use std::env;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let opts = config.decode_options();

    match cli.command {
        Commands::Demux { file, content_type } => {
            let content_type = match content_type {
                Some(value) => ContentType::classify(&value, &opts.raw_stream_content_type),
                None => ContentType::RawStream,
            };
            demux(&file, content_type, &opts).await
        }
        Commands::Json { file, chunked } => json(&file, chunked, &opts).await,
        Commands::Map { table, file } => map(&table, &file),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::discover(&env::current_dir()?)?,
    };
    config.apply_env()
}

async fn demux(path: &Path, content_type: ContentType, opts: &DecodeOptions) -> Result<()> {
    let reader = BufReader::new(File::open(path).await?);
    let mut demuxer = StreamDemuxer::with_options(reader, content_type, opts);

    while let Some(item) = demuxer.next_chunk().await {
        match item {
            Ok(chunk) => {
                let text = match &chunk.body {
                    ChunkBody::Text(text) => text.trim_end_matches('\n').to_string(),
                    ChunkBody::Json(value) => value.to_string(),
                    ChunkBody::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
                };
                println!("{}: {}", chunk.stream, text);
            }
            Err(e) if !e.is_fatal() => tracing::warn!(error = %e, "skipping chunk"),
            Err(e) => return Err(DecodeError::from(e).into()),
        }
    }

    tracing::debug!(frames = demuxer.frames_read(), "demux finished");
    Ok(())
}

async fn json(path: &Path, chunked: bool, opts: &DecodeOptions) -> Result<()> {
    let reader = BufReader::new(File::open(path).await?);
    let mut decoder = ChunkedJsonDecoder::with_options(reader, chunked, opts);

    while let Some(item) = decoder.next_value().await {
        let value = item.map_err(DecodeError::from)?;
        println!("{}", value);
    }
    Ok(())
}

fn map(table: &str, path: &Path) -> Result<()> {
    let table: Table = table.parse().map_err(Error::UnknownTable)?;
    let document: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let mapper = ModelMapper::default();

    // Decode tables show what was claimed and what was not; encode tables
    // print the request body as it goes on the wire.
    let apply = |item: Value| -> Result<Value> {
        match table.direction() {
            Direction::Decode => Ok(serde_json::to_value(mapper.consume_value(table, item)?)?),
            Direction::Encode => Ok(Value::Object(mapper.produce_value(table, item)?.merged()?)),
        }
    };

    let output = match document {
        Value::Array(items) => {
            let mapped = items.into_iter().map(apply).collect::<Result<Vec<_>>>()?;
            serde_json::to_string_pretty(&mapped)?
        }
        other => serde_json::to_string_pretty(&apply(other)?)?,
    };

    println!("{}", output);
    Ok(())
}
