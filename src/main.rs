use bookflow::{Book, ChannelSource, Fragment, Session, SessionConfig};
use tokio::time::{sleep, Duration};
use tracing_subscriber::EnvFilter;

/// Simulated generator answer: a preamble line, then NDJSON split at awkward places.
const ANSWER: &str = "Here are some picks:\n\
{\"title\":\"Dune\",\"author\":\"Frank Herbert\",\"isbn\":\"9780441172719\",\"genre\":\"Science Fiction\",\"reason\":\"Politics {and} ecology on a desert planet\"}\n\
{\"title\":\"Neuromancer\",\"author\":\"William Gibson\",\"genre\":\"Cyberpunk\"}\n\
{\"title\":\"The Left Hand of Darkness\",\"author\":\"Ursula K. Le Guin\",\"isbn\":\"9780441478125\",\"genre\":\"Science Fiction\",\"reason\":\"A \\\"thought experiment\\\" about gender\"}\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let query = if query.is_empty() { "classic science fiction".to_string() } else { query };

    // Spawn a background task that delivers the answer in small pieces.
    let (tx, source) = ChannelSource::channel(4);
    tokio::spawn(async move {
        for piece in ANSWER.as_bytes().chunks(23) {
            let text = String::from_utf8_lossy(piece).into_owned();
            if tx.send(Ok(Fragment::Text(text))).await.is_err() {
                break;
            }
            sleep(Duration::from_millis(15)).await;
        }
    });

    println!("\nStreaming recommendations for {:?}...\n", query);

    let mut session = Session::new(query, source, SessionConfig::default());
    let mut found = 0;
    loop {
        match session.next_record().await {
            Ok(Some(record)) => {
                found += 1;
                let book = Book::from_record(record)?;
                println!("{:?}", book);
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    println!("\n✅ Done! Found {} books", found);
    Ok(())
}
