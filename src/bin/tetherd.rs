//! Tether daemon binary
//!
//! Binds a TCP port and answers the command protocol until killed.

use anyhow::Result;
use std::env;
use std::process;

use tether::server::Server;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut bind_host = "0.0.0.0".to_string();
    let mut port: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "--bind" if i + 1 < args.len() => {
                bind_host = args[i + 1].clone();
                i += 2;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: unknown option '{}'", arg);
                print_usage();
                process::exit(2);
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
                print_usage();
                process::exit(2);
            }
        }
    }

    let port = match port {
        Some(port) => port,
        None => {
            print_usage();
            process::exit(2);
        }
    };

    let addr = format!("{}:{}", bind_host, port);
    let server = match Server::bind(&addr) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: failed to bind {}: {}", addr, e);
            process::exit(1);
        }
    };

    println!(
        "tetherd: serving {} from {}",
        server.local_addr()?,
        env::current_dir()?.display()
    );
    println!("Press Ctrl-C to stop.");

    server.run()?;
    Ok(())
}

fn print_usage() {
    println!("tetherd - tether protocol daemon");
    println!();
    println!("USAGE:");
    println!("    tetherd <port> [--bind <host>]");
    println!();
    println!("Serves pwd, ls, cat, get and echo against its working directory.");
    println!("Binds 0.0.0.0 unless --bind is given.");
}
