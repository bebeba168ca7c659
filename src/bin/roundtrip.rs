//! pir-roundtrip: seal a message into a mailbox row and retrieve it via PIR
//!
//! Runs both sides in one process: a friend seals a message into the
//! server's database, the reader fetches that row with a private query,
//! passing query and answer through their byte encodings, and opens it.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mailbox_pir::envelope::kx::{derive_read_write_keys, KeyPair};
use mailbox_pir::envelope::{open_message, seal_message};
use mailbox_pir::params::BfvParams;
use mailbox_pir::pir::{Answer, PirClient, PirServer, Query};

#[derive(Parser)]
#[command(name = "pir-roundtrip")]
#[command(about = "Store a sealed message and fetch it back with PIR")]
#[command(version)]
struct Args {
    /// BFV parameters as JSON (defaults to the production set)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Rows to allocate on the server
    #[arg(long, default_value = "4096")]
    rows: usize,

    /// Row holding the message
    #[arg(long, default_value = "0")]
    index: usize,

    /// Row count the client sizes its query against (defaults to --rows)
    #[arg(long)]
    believed_rows: Option<usize>,

    /// Message to seal
    #[arg(long, default_value = "hello")]
    message: String,
}

fn load_params(path: Option<&PathBuf>) -> Result<BfvParams> {
    let params = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open params file: {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| "Failed to deserialize params")?
        }
        None => BfvParams::production(),
    };
    params
        .validate()
        .map_err(|e| eyre::eyre!("Invalid parameters: {}", e))?;
    Ok(params)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let params = load_params(args.params.as_ref())?;
    let believed_rows = args.believed_rows.unwrap_or(args.rows);

    if args.rows == 0 || args.index >= args.rows {
        return Err(eyre::eyre!(
            "Index {} is outside the {} allocated rows",
            args.index,
            args.rows
        ));
    }

    info!("Mailbox PIR round trip");
    info!(
        "Ring dimension: {}, rows: {}, believed rows: {}",
        params.poly_degree, args.rows, believed_rows
    );

    let reader = KeyPair::generate();
    let writer = KeyPair::generate();
    let reader_keys = derive_read_write_keys(&reader, &writer.public_key())?;
    let writer_keys = derive_read_write_keys(&writer, &reader.public_key())?;

    let server = PirServer::new(params.clone())?;
    let setup_start = Instant::now();
    server.allocate_to(args.rows - 1);
    let sealed = seal_message(args.message.as_bytes(), &writer_keys.write)?;
    if sealed.truncated {
        info!("Message truncated to one row");
    }
    server.set_value(args.index, &sealed.row)?;
    info!(
        "Server ready: {} chunks in {:.2?}",
        server.chunk_count(),
        setup_start.elapsed()
    );

    let client = PirClient::new(params)?;
    let query_start = Instant::now();
    let query = client.build_query(args.index, believed_rows)?;
    let query_bytes = query.to_bytes(client.context())?;
    info!(
        "Query: {} ciphertexts, {} bytes in {:.2?}",
        query.chunk_count(),
        query_bytes.len(),
        query_start.elapsed()
    );

    let answer_start = Instant::now();
    let received = Query::from_bytes(server.context(), &query_bytes)?;
    let answer_bytes = server.answer(&received)?.to_bytes(server.context())?;
    info!(
        "Answer: {} bytes in {:.2?}",
        answer_bytes.len(),
        answer_start.elapsed()
    );

    let answer = Answer::from_bytes(client.context(), &answer_bytes)?;
    let row = client.decode(&answer, args.index)?;
    let opened = open_message(&row, &reader_keys.read)?;

    println!("{}", String::from_utf8_lossy(&opened));
    Ok(())
}
