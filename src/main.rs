use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use huffstream::{AdaptiveTree, BitBuffer, Decoded};

#[derive(Parser, Debug)]
#[command(name = "huffstream", about = "Adaptive Huffman coding for byte streams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress a file, one adaptive code per input byte.
    Encode {
        /// File to compress.
        input: PathBuf,
        /// Where to write the bit stream.
        output: PathBuf,
        /// Print code-table statistics afterwards.
        #[arg(long)]
        stats: bool,
    },
    /// Decompress a file produced by `encode`.
    Decode {
        /// Compressed bit stream.
        input: PathBuf,
        /// Where to write the recovered bytes.
        output: PathBuf,
        /// Print code-table statistics afterwards.
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            input,
            output,
            stats,
        } => run_encode(input, output, stats),
        Commands::Decode {
            input,
            output,
            stats,
        } => run_decode(input, output, stats),
    }
}

fn run_encode(input: PathBuf, output: PathBuf, stats: bool) -> Result<()> {
    let data = fs::read(&input)
        .with_context(|| format!("failed to read input from {}", input.display()))?;

    let mut sink = BitBuffer::new();
    let mut tree: AdaptiveTree<u8> = AdaptiveTree::new();
    for byte in &data {
        tree.encode(Some(byte), &mut sink)
            .context("encoding failed")?;
    }
    tree.encode(None, &mut sink).context("encoding failed")?;

    if stats {
        report(&tree);
    }

    let packed = sink.into_bytes();
    println!(
        "{} bytes in, {} bytes out ({:.1}% of original)",
        data.len(),
        packed.len(),
        if data.is_empty() {
            100.0
        } else {
            100.0 * packed.len() as f64 / data.len() as f64
        }
    );
    fs::write(&output, packed)
        .with_context(|| format!("failed to write output to {}", output.display()))?;

    Ok(())
}

fn run_decode(input: PathBuf, output: PathBuf, stats: bool) -> Result<()> {
    let packed = fs::read(&input)
        .with_context(|| format!("failed to read input from {}", input.display()))?;

    let buffer = BitBuffer::from_bytes(&packed);
    let mut source = buffer.reader();
    let mut tree: AdaptiveTree<u8> = AdaptiveTree::new();
    let mut data = Vec::new();
    loop {
        match tree.decode(&mut source).context("decoding failed")? {
            Decoded::Symbol(byte) => data.push(byte),
            Decoded::End => break,
        }
    }

    if stats {
        report(&tree);
    }

    println!("{} bytes in, {} bytes out", packed.len(), data.len());
    fs::write(&output, data)
        .with_context(|| format!("failed to write output to {}", output.display()))?;

    Ok(())
}

fn report(tree: &AdaptiveTree<u8>) {
    let stats = tree.stats();
    println!(
        "symbols={}\tdistinct={}\tnodes={}\tavg_code_len={:.2} bits",
        stats.symbols_processed, stats.distinct_symbols, stats.nodes, stats.average_code_len
    );
}
