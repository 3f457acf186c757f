//! Interactive chat over a streaming endpoint.
//!
//! Set CHATSTREAM_URL (and optionally CHATSTREAM_API_KEY) and run:
//!   cargo run -p chatstream-session --example chat
//!
//! Use RUST_LOG=chatstream_session=debug to see session lifecycle logs.

use std::io::Write;
use std::sync::Mutex;

use chatstream_session::{Conversation, HttpTransport, Submission};
use chatstream_types::{Role, Transcript};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Prints only the text added to the last assistant turn since the last call.
struct Printer {
    printed: Mutex<(usize, usize)>,
}

impl Printer {
    fn print(&self, transcript: &Transcript) {
        let index = transcript.len().saturating_sub(1);
        let Some(turn) = transcript.last().filter(|t| t.role == Role::Assistant) else {
            return;
        };
        let mut printed = self.printed.lock().unwrap_or_else(|e| e.into_inner());
        let (last_index, last_len) = *printed;
        let start = if last_index == index { last_len } else { 0 };
        if let Some(new) = turn.content.get(start..) {
            print!("{new}");
            let _ = std::io::stdout().flush();
        }
        *printed = (index, turn.content.len());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let transport = HttpTransport::from_env()?;
    let printer = Printer {
        printed: Mutex::new((usize::MAX, 0)),
    };
    let conversation =
        Conversation::new(transport).observer(move |t: &Transcript| printer.print(t));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("> ");
    std::io::stdout().flush()?;
    while let Some(line) = lines.next_line().await? {
        match conversation.submit(&line).await {
            Submission::Finished(report) => {
                println!();
                if let Some(truncation) = report.truncation {
                    eprintln!("(reply cut short: {truncation:?})");
                }
            }
            Submission::Empty => {}
            Submission::Busy | Submission::Closed | Submission::Cancelled => break,
        }
        print!("> ");
        std::io::stdout().flush()?;
    }

    conversation.close();
    Ok(())
}
