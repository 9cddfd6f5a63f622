//! Peer daemon
//!
//! Serves the command protocol over TCP: accepts connections, reads request
//! objects straight off the stream, runs each command against the process
//! working directory, and answers with terminated response frames.
//!
//! Commands: `pwd`, `ls [dir]`, `cat <file>`, `get <file>`, `echo [args]`.
//! Anything else is answered with a failure response, never a dropped
//! connection. A request whose `closed` flag is set ends the connection
//! without an answer.

use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::command::DOWNLOAD_COMMAND;
use crate::protocol::{encode_response, CommandMessage, ResponseMessage};

const LS_USAGE: &str = "usage: ls [directory]";
const CAT_USAGE: &str = "usage: cat <file>";
const GET_USAGE: &str = "usage: get <file>";

/// TCP server answering the command protocol.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind to `addr`, for example `0.0.0.0:4444`. Port 0 picks a free port.
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one handler thread per connection.
    pub fn run(&self) -> std::io::Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream) {
                            eprintln!("tetherd: connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    eprintln!("tetherd: accept failed: {}", e);
                }
            }
        }
        Ok(())
    }
}

/// Serve one connection until the peer closes it or asks to.
fn handle_connection(stream: TcpStream) -> Result<()> {
    let peer = stream.peer_addr()?;
    println!("tetherd: connection from {}", peer);

    let reader = stream.try_clone()?;
    let mut writer = stream;
    let mut requests = serde_json::Deserializer::from_reader(reader).into_iter::<CommandMessage>();

    while let Some(request) = requests.next() {
        let request = match request {
            Ok(request) => request,
            Err(e) if e.is_eof() => break,
            Err(e) => {
                // One failure answer, then drop: the stream decoder cannot
                // resynchronize after garbage.
                let reply = ResponseMessage::failure(format!("malformed request: {}", e));
                let _ = writer.write_all(&encode_response(&reply)?);
                break;
            }
        };

        if request.closed {
            break;
        }

        let response = execute(&request);
        writer.write_all(&encode_response(&response)?)?;
        writer.flush()?;
    }

    println!("tetherd: connection closed for {}", peer);
    Ok(())
}

/// Run one command against the process working directory.
fn execute(request: &CommandMessage) -> ResponseMessage {
    let name = request.command.trim();
    let args: &[String] = request.args.as_deref().unwrap_or(&[]);

    match name.to_ascii_lowercase().as_str() {
        "pwd" => current_dir_response(),
        "ls" => listing_response(args),
        "cat" => file_response(args, false),
        "echo" => ResponseMessage::ok(args.join(" ").as_bytes()),
        lowered if lowered == DOWNLOAD_COMMAND => file_response(args, true),
        _ => ResponseMessage::failure(format!("unknown command: {}", name)),
    }
}

fn current_dir_response() -> ResponseMessage {
    match std::env::current_dir() {
        Ok(path) => ResponseMessage::ok(path.display().to_string().as_bytes()),
        Err(e) => ResponseMessage::failure(e.to_string()),
    }
}

fn listing_response(args: &[String]) -> ResponseMessage {
    if args.len() > 1 {
        return ResponseMessage::failure(LS_USAGE);
    }
    let target = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    match list_directory(&target) {
        Ok(listing) => ResponseMessage::ok(listing.as_bytes()),
        Err(e) => ResponseMessage::failure(format!("{}: {}", target.display(), e)),
    }
}

/// One entry per line: kind marker, size, modification time, name.
fn list_directory(path: &Path) -> std::io::Result<String> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(path)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut listing = String::new();
    for entry in entries {
        // Entries that cannot be stat'ed are skipped.
        if let Ok(metadata) = entry.metadata() {
            let kind = if metadata.is_dir() { "(d)" } else { "(f)" };
            let modified = metadata
                .modified()
                .map(format_modified)
                .unwrap_or_else(|_| "?".to_string());
            let name = entry.file_name().to_string_lossy().into_owned();
            listing.push_str(&format!(
                "{}\t{}\t\t{}\t{}\n",
                kind,
                metadata.len(),
                modified,
                name
            ));
        }
    }
    Ok(listing)
}

fn format_modified(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn file_response(args: &[String], download: bool) -> ResponseMessage {
    if args.len() != 1 {
        let usage = if download { GET_USAGE } else { CAT_USAGE };
        return ResponseMessage::failure(usage);
    }
    let name = &args[0];
    match fs::read(name) {
        Ok(bytes) if download => ResponseMessage::ok_file(&bytes, name.clone()),
        Ok(bytes) => ResponseMessage::ok(&bytes),
        Err(e) => ResponseMessage::failure(format!("{}: {}", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_payload;
    use std::fs::File;
    use tempfile::TempDir;

    fn request(command: &str, args: &[&str]) -> CommandMessage {
        CommandMessage {
            command: command.to_string(),
            args: if args.is_empty() {
                None
            } else {
                Some(args.iter().map(|s| s.to_string()).collect())
            },
            closed: false,
        }
    }

    #[test]
    fn test_pwd_reports_working_directory() {
        let response = execute(&request("pwd", &[]));
        assert!(response.success);
        let payload = decode_payload(&response).unwrap();
        let reported = String::from_utf8(payload).unwrap();
        assert_eq!(
            PathBuf::from(reported),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_echo_joins_args() {
        let response = execute(&request("echo", &["hello", "world"]));
        assert!(response.success);
        assert_eq!(decode_payload(&response).unwrap(), b"hello world");
    }

    #[test]
    fn test_echo_without_args_is_empty() {
        let response = execute(&request("echo", &[]));
        assert!(response.success);
        assert_eq!(decode_payload(&response).unwrap(), b"");
    }

    #[test]
    fn test_unknown_command_fails() {
        let response = execute(&request("badcmd", &[]));
        assert!(!response.success);
        assert_eq!(
            response.error_description.as_deref(),
            Some("unknown command: badcmd")
        );
    }

    #[test]
    fn test_command_matching_is_case_insensitive() {
        assert!(execute(&request("PWD", &[])).success);
        assert!(execute(&request("Echo", &["hi"])).success);
    }

    #[test]
    fn test_cat_returns_file_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"line one\nline two\n").unwrap();

        let response = execute(&request("cat", &[path.to_str().unwrap()]));
        assert!(response.success);
        assert_eq!(decode_payload(&response).unwrap(), b"line one\nline two\n");
        assert_eq!(response.file_name, None);
    }

    #[test]
    fn test_cat_missing_file_fails() {
        let response = execute(&request("cat", &["/no/such/file"]));
        assert!(!response.success);
        assert!(response.error_description.unwrap().contains("/no/such/file"));
    }

    #[test]
    fn test_cat_arity() {
        assert_eq!(
            execute(&request("cat", &[])).error_description.as_deref(),
            Some(CAT_USAGE)
        );
        assert_eq!(
            execute(&request("cat", &["a", "b"]))
                .error_description
                .as_deref(),
            Some(CAT_USAGE)
        );
    }

    #[test]
    fn test_get_carries_file_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        fs::write(&path, b"a,b\n").unwrap();
        let path = path.to_str().unwrap().to_string();

        let response = execute(&request("get", &[&path]));
        assert!(response.success);
        assert_eq!(response.file_name.as_deref(), Some(path.as_str()));
        assert_eq!(decode_payload(&response).unwrap(), b"a,b\n");
    }

    #[test]
    fn test_get_arity() {
        assert_eq!(
            execute(&request("get", &[])).error_description.as_deref(),
            Some(GET_USAGE)
        );
    }

    #[test]
    fn test_ls_lists_entries() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("beta.txt")).unwrap();
        File::create(dir.path().join("alpha.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let response = execute(&request("ls", &[dir.path().to_str().unwrap()]));
        assert!(response.success);
        let listing = String::from_utf8(decode_payload(&response).unwrap()).unwrap();

        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        // Sorted by name, files marked (f) and directories (d).
        assert!(lines[0].starts_with("(f)"));
        assert!(lines[0].ends_with("alpha.txt"));
        assert!(lines[1].ends_with("beta.txt"));
        assert!(lines[2].starts_with("(d)"));
        assert!(lines[2].ends_with("sub"));
    }

    #[test]
    fn test_ls_rejects_extra_args() {
        let response = execute(&request("ls", &["a", "b"]));
        assert!(!response.success);
        assert_eq!(response.error_description.as_deref(), Some(LS_USAGE));
    }

    #[test]
    fn test_ls_missing_directory_fails() {
        let response = execute(&request("ls", &["/no/such/dir"]));
        assert!(!response.success);
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let server = Server::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
