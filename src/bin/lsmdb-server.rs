//! lsmdb server: serves the one-letter command language over a local
//! Unix-domain stream socket, one thread per connection.

use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lsmdb::{execute_command, parse_command, wire, LsmTree};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let db_path = PathBuf::from(args.next().unwrap_or_else(|| "./lsmdb_data".to_string()));
    let socket_path = PathBuf::from(args.next().unwrap_or_else(|| "./lsmdb.sock".to_string()));

    match run(db_path, socket_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed to start");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: PathBuf, socket_path: PathBuf) -> lsmdb::Result<()> {
    let tree = Arc::new(LsmTree::open(&db_path)?);

    // An unclean shutdown leaves the socket file behind.
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)?;
    info!(
        socket = %socket_path.display(),
        db = %db_path.display(),
        "listening"
    );

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let tree = Arc::clone(&tree);
                thread::spawn(move || handle_client(tree, stream));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
    Ok(())
}

fn handle_client(tree: Arc<LsmTree>, stream: UnixStream) {
    let mut reader = match stream.try_clone() {
        Ok(clone) => clone,
        Err(e) => {
            warn!(error = %e, "failed to clone client stream");
            return;
        }
    };
    let mut writer = stream;

    loop {
        let request = match wire::read_frame(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "dropping client after bad frame");
                return;
            }
        };

        let response = match parse_command(&request) {
            Ok(command) => execute_command(&tree, command),
            Err(e) => format!("Error: {}", e),
        };

        if let Err(e) = wire::write_frame(&mut writer, &response) {
            warn!(error = %e, "failed to write response");
            return;
        }
    }
}
