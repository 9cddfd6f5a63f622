//! Interactive tether client binary
//!
//! Connects to a peer, then turns each operator line into one protocol
//! round trip: print the text the peer answers with, save downloads, show
//! peer-reported errors. `exit` ends the session.

use std::borrow::Cow;
use std::env;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use nu_ansi_term::Color;
use reedline::{
    FileBackedHistory, Prompt, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal,
};

use tether::config::{parse_timeout, ClientConfig};
use tether::dispatch::{Dispatched, Dispatcher};
use tether::session::{LineOutcome, Session};
use tether::transport::Connection;

/// Entries kept in the reedline history file.
const HISTORY_CAPACITY: usize = 1000;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut config = ClientConfig::from_env();
    let mut use_history = true;
    let mut host: Option<String> = None;
    let mut port: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "--timeout" if i + 1 < args.len() => {
                config.timeout = parse_timeout(&args[i + 1]);
                i += 2;
            }
            "--download-dir" if i + 1 < args.len() => {
                config.download_dir = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--no-history" => {
                use_history = false;
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: unknown option '{}'", arg);
                print_help();
                process::exit(2);
            }
            arg if host.is_none() => {
                host = Some(arg.to_string());
                i += 1;
            }
            arg if port.is_none() => {
                match arg.parse::<u16>() {
                    Ok(parsed) => port = Some(parsed),
                    Err(_) => {
                        eprintln!("Error: invalid port '{}'", arg);
                        process::exit(2);
                    }
                }
                i += 1;
            }
            arg => {
                eprintln!("Error: unexpected argument '{}'", arg);
                print_help();
                process::exit(2);
            }
        }
    }

    let (host, port) = match (host, port) {
        (Some(host), Some(port)) => (host, port),
        _ => {
            print_help();
            process::exit(2);
        }
    };

    let connection = match Connection::connect(&host, port) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("{}", Color::Red.paint(format!("Error: {}", e)));
            process::exit(1);
        }
    };
    if let Some(timeout) = config.timeout {
        connection.set_read_timeout(Some(timeout))?;
    }
    let peer = connection.peer().to_string();

    let dispatcher = Dispatcher::new(io::stdout()).with_download_dir(config.download_dir.clone());
    let session = Session::new(connection, dispatcher);

    let history_file = if use_history { config.history_file } else { None };

    if atty::is(atty::Stream::Stdin) {
        run_interactive(session, &peer, history_file)
    } else {
        run_non_interactive(session)
    }
}

/// Prompt showing the peer address
struct TetherPrompt {
    peer: String,
}

impl TetherPrompt {
    fn new(peer: &str) -> Self {
        Self {
            peer: peer.to_string(),
        }
    }
}

impl Prompt for TetherPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Owned(format!("{}> ", self.peer))
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn run_interactive(
    mut session: Session<io::Stdout>,
    peer: &str,
    history_file: Option<PathBuf>,
) -> Result<()> {
    let mut line_editor = Reedline::create();
    if let Some(path) = history_file {
        match FileBackedHistory::with_file(HISTORY_CAPACITY, path.clone()) {
            Ok(history) => {
                line_editor = line_editor.with_history(Box::new(history));
            }
            Err(e) => {
                eprintln!("Warning: could not open history {}: {}", path.display(), e);
            }
        }
    }
    let prompt = TetherPrompt::new(peer);

    loop {
        let sig = line_editor.read_line(&prompt);

        match sig {
            Ok(Signal::Success(buffer)) => {
                if !process_line(&mut session, &buffer) {
                    break;
                }
            }
            Ok(Signal::CtrlC) => {
                // Reedline already cleared the line; just prompt again.
                continue;
            }
            Ok(Signal::CtrlD) => {
                break;
            }
            Err(e) => {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                eprintln!("Error reading line: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn run_non_interactive(mut session: Session<io::Stdout>) -> Result<()> {
    let stdin = io::stdin();
    let reader = BufReader::new(stdin.lock());

    for line_result in reader.lines() {
        let line = line_result?;
        if !process_line(&mut session, &line) {
            break;
        }
    }

    Ok(())
}

/// Run one operator line through the session. Returns false once the
/// session is over.
fn process_line(session: &mut Session<io::Stdout>, line: &str) -> bool {
    match session.handle_line(line) {
        Ok(LineOutcome::Empty) => true,
        Ok(LineOutcome::Completed(Dispatched::Saved { path, bytes })) => {
            eprintln!("saved {} bytes to {}", bytes, path.display());
            true
        }
        Ok(LineOutcome::Completed(_)) => true,
        Ok(LineOutcome::Terminated) => false,
        Err(e) if e.is_fatal() => {
            eprintln!("{}", Color::Red.paint(format!("Error: {}", e)));
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", Color::Yellow.paint(format!("Warning: {}", e)));
            true
        }
    }
}

fn print_help() {
    println!("tether - remote command client");
    println!();
    println!("USAGE:");
    println!("    tether <host> <port> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --timeout <secs>       Give up on a response after this many seconds");
    println!("    --download-dir <dir>   Save downloads into this directory");
    println!("    --no-history           Do not read or write the history file");
    println!("    -h, --help             Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    TETHER_TIMEOUT         Default for --timeout");
    println!("    TETHER_DOWNLOAD_DIR    Default for --download-dir");
    println!("    TETHER_HISTORY         History file (default ~/.tether_history)");
    println!();
    println!("Each line is sent to the peer as a command and its response is");
    println!("printed. 'get <file>' saves the response to disk instead, and");
    println!("'exit' ends the session.");
}
