use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod input;
use pemkeys::{
    CreateFileArgs, SecretKeyWriter, default_key_dir, load_all_keys_from_pem_file,
    load_sk_from_pem_file,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const KEY_FILE_EXTENSION: &str = "pem";

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => Ok(d),
        None => default_key_dir().context("could not determine platform directories"),
    }
}

fn require_file(file: Option<PathBuf>) -> Result<PathBuf> {
    file.context("no key file given; pass --file or set PEMKEYS_FILE")
}

#[derive(Debug, Parser)]
#[command(name = "pemkeys")]
#[command(version, about = "Stores labelled secret keys in append-only PEM files.")]
struct Cli {
    /// Path to the PEM key file
    #[arg(long, global = true, value_name = "PATH", env = "PEMKEYS_FILE")]
    file: Option<PathBuf>,

    /// Directory new timestamped key files are created in
    #[arg(long, global = true, value_name = "DIR", env = "PEMKEYS_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Appends a secret key under the given identifier
    #[command(arg_required_else_help = true)]
    Add {
        identifier: String,

        /// File name prefix used when a new file is created
        #[arg(long, default_value = "key")]
        prefix: String,
    },

    /// Prints the identifier and secret key stored at a position
    #[command(arg_required_else_help = true)]
    Get {
        #[arg(allow_negative_numbers = true)]
        index: isize,
    },

    /// Lists the stored identifiers
    List {
        #[arg(long, default_value_t = false)]
        /// Print as JSON
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct ListedKey<'a> {
    index: usize,
    identifier: &'a str,
    key_len: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    match args.command {
        Commands::Add { identifier, prefix } => {
            let sk = input::read_secret_key()?;
            let mut writer = match args.file {
                Some(path) => SecretKeyWriter::open_append(&path)?,
                None => SecretKeyWriter::create(&CreateFileArgs {
                    directory: resolve_dir(args.dir)?,
                    prefix,
                    file_extension: KEY_FILE_EXTENSION.to_string(),
                })?,
            };
            writer
                .append(&identifier, &sk)
                .with_context(|| format!("failed to store key '{identifier}'"))?;
            writer.close()?;

            if let Some(path) = writer.path() {
                println!("stored key '{identifier}' in {}", path.display());
            }
        }
        Commands::Get { index } => {
            let path = require_file(args.file)?;
            let (sk, identifier) = load_sk_from_pem_file(&path, index)?;
            println!("{identifier}");
            println!("{}", hex::encode(&sk[..]));
        }
        Commands::List { json } => {
            let path = require_file(args.file)?;
            let keys = load_all_keys_from_pem_file(&path)?;
            let listed: Vec<ListedKey> = keys
                .iter()
                .enumerate()
                .map(|(index, (identifier, sk))| ListedKey {
                    index,
                    identifier,
                    key_len: sk.len(),
                })
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&listed)?);
                return Ok(());
            }

            let id_width = listed
                .iter()
                .map(|k| k.identifier.len())
                .chain(std::iter::once("Identifier".len()))
                .max()
                .unwrap_or_default();

            println!("{:<5}  {:<id_width$}  {}", "Index", "Identifier", "Bytes");
            println!("{:-<5}  {:-<id_width$}  {:-<5}", "", "", "");
            for k in listed {
                println!("{:<5}  {:<id_width$}  {}", k.index, k.identifier, k.key_len);
            }
        }
    }

    Ok(())
}
