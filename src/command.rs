//! Operator command model
//!
//! One line of operator input becomes one [`Command`]: a name, its arguments
//! in order, and a termination flag. Two names carry built-in meaning for the
//! client; everything else is opaque and interpreted by the peer.

/// Command name that ends the session. The command is still sent so the peer
/// can release the connection, but no response is read for it.
pub const EXIT_COMMAND: &str = "exit";

/// Command name whose response carries file content to save locally instead
/// of text to display.
pub const DOWNLOAD_COMMAND: &str = "get";

/// One parsed operator command.
///
/// `terminate` must be stated at construction; [`Command::parse`] derives it
/// from the name, direct construction spells it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name as the operator typed it.
    pub name: String,
    /// Arguments in input order. Never contains empty tokens.
    pub args: Vec<String>,
    /// Whether this command ends the session after being sent.
    pub terminate: bool,
}

impl Command {
    /// Parse one line of operator input.
    ///
    /// Tokens are split on runs of whitespace; the first is the name, the
    /// rest are arguments. Returns `None` when the line holds no tokens.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?.to_string();
        let args: Vec<String> = tokens.map(String::from).collect();
        let terminate = name.eq_ignore_ascii_case(EXIT_COMMAND);
        Some(Self {
            name,
            args,
            terminate,
        })
    }

    /// Whether the response to this command is a file download.
    pub fn is_download(&self) -> bool {
        self.name.eq_ignore_ascii_case(DOWNLOAD_COMMAND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let command = Command::parse("pwd").unwrap();
        assert_eq!(command.name, "pwd");
        assert!(command.args.is_empty());
        assert!(!command.terminate);
    }

    #[test]
    fn test_parse_name_and_args() {
        let command = Command::parse("get /reports/jan.csv").unwrap();
        assert_eq!(command.name, "get");
        assert_eq!(command.args, vec!["/reports/jan.csv"]);
        assert!(!command.terminate);
    }

    #[test]
    fn test_parse_collapses_whitespace_runs() {
        let command = Command::parse("  ls \t  src   target  ").unwrap();
        assert_eq!(command.name, "ls");
        assert_eq!(command.args, vec!["src", "target"]);
        assert!(command.args.iter().all(|arg| !arg.is_empty()));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   \t  "), None);
    }

    #[test]
    fn test_parse_exit_sets_terminate() {
        assert!(Command::parse("exit").unwrap().terminate);
        assert!(Command::parse("EXIT").unwrap().terminate);
        assert!(Command::parse("Exit now").unwrap().terminate);
    }

    #[test]
    fn test_is_download() {
        assert!(Command::parse("get notes.txt").unwrap().is_download());
        assert!(Command::parse("GET notes.txt").unwrap().is_download());
        assert!(!Command::parse("cat notes.txt").unwrap().is_download());
    }

    #[test]
    fn test_parse_round_trips_tokens() {
        let line = "get /reports/jan.csv extra";
        let command = Command::parse(line).unwrap();
        let mut tokens = vec![command.name.clone()];
        tokens.extend(command.args.iter().cloned());
        assert_eq!(tokens.join(" "), line);
    }

    #[test]
    fn test_direct_construction_states_terminate() {
        let command = Command {
            name: "shutdown".to_string(),
            args: vec![],
            terminate: true,
        };
        assert!(command.terminate);
        assert!(!command.is_download());
    }
}
