//! Interactive lsmdb client: reads command lines from stdin, sends each
//! over the server socket, and prints the response.

use std::io::{self, BufRead, Write};
use std::os::unix::net::UnixStream;
use std::process::ExitCode;

use lsmdb::wire;

fn main() -> ExitCode {
    let socket_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./lsmdb.sock".to_string());

    let stream = match UnixStream::connect(&socket_path) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("cannot connect to {}: {}", socket_path, e);
            return ExitCode::FAILURE;
        }
    };
    let mut reader = match stream.try_clone() {
        Ok(clone) => clone,
        Err(e) => {
            eprintln!("cannot clone socket: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut writer = stream;

    let stdin = io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("stdin error: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        if let Err(e) = wire::write_frame(&mut writer, line) {
            eprintln!("send failed: {}", e);
            return ExitCode::FAILURE;
        }
        match wire::read_frame(&mut reader) {
            Ok(Some(response)) => println!("{}", response),
            Ok(None) => {
                eprintln!("server closed the connection");
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("receive failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
        prompt();
    }

    ExitCode::SUCCESS
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}
