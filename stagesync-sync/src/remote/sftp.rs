//! SFTP backend over libssh2.
//!
//! One TCP connection, one authenticated session, one SFTP channel. The
//! session is closed when the value is dropped, on success and error paths
//! alike.

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ssh2::{ErrorCode, Session, Sftp};

use stagesync_core::{FileMetadata, SessionParams};

use super::{RemoteError, RemoteFileSystem};
use crate::path::RemotePosixPath;

/// Applies to TCP connect, handshake and authentication only.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

const FX_NO_SUCH_FILE: i32 = 2;
const FX_FILE_ALREADY_EXISTS: i32 = 11;
const DIR_MODE: i32 = 0o755;

pub struct SftpRemote {
    sftp: Sftp,
    session: Session,
    label: String,
}

fn session_err(what: &str, e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Session(format!("{what}: {e}"))
}

fn sftp_code(e: &ssh2::Error) -> Option<i32> {
    match e.code() {
        ErrorCode::SFTP(code) => Some(code),
        _ => None,
    }
}

/// Map an SFTP status onto the backend-neutral error kinds.
fn classify(path: &RemotePosixPath, e: ssh2::Error) -> RemoteError {
    match sftp_code(&e) {
        Some(FX_NO_SUCH_FILE) => RemoteError::NotFound {
            path: path.to_string(),
        },
        Some(FX_FILE_ALREADY_EXISTS) => RemoteError::AlreadyExists {
            path: path.to_string(),
        },
        _ => RemoteError::io(path, e.into()),
    }
}

impl SftpRemote {
    /// Connect, authenticate with a password and open the SFTP channel.
    pub fn connect(params: &SessionParams) -> Result<Self, RemoteError> {
        let label = format!("{}@{}:{}", params.user, params.host, params.port);
        tracing::info!("[ssh] connecting to {label} ...");

        let addr = (params.host.as_str(), params.port)
            .to_socket_addrs()
            .map_err(|e| session_err("resolve", e))?
            .next()
            .ok_or_else(|| RemoteError::Session(format!("no address for {}", params.host)))?;
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| session_err("connect", e))?;

        let mut session = Session::new().map_err(|e| session_err("session", e))?;
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| session_err("handshake", e))?;
        session
            .userauth_password(&params.user, &params.password)
            .map_err(|e| session_err("authentication", e))?;
        if !session.authenticated() {
            return Err(RemoteError::Session(format!("authentication rejected for {label}")));
        }
        // Transfers themselves run without a timeout.
        session.set_timeout(0);

        let sftp = session.sftp().map_err(|e| session_err("sftp channel", e))?;
        Ok(Self {
            sftp,
            session,
            label,
        })
    }
}

impl Drop for SftpRemote {
    fn drop(&mut self) {
        if let Err(e) = self.session.disconnect(None, "stagesync done", None) {
            tracing::debug!("disconnect from {} failed: {e}", self.label);
        } else {
            tracing::debug!("disconnected from {}", self.label);
        }
    }
}

impl RemoteFileSystem for SftpRemote {
    fn stat(&mut self, path: &RemotePosixPath) -> Result<FileMetadata, RemoteError> {
        match self.sftp.stat(Path::new(path.as_str())) {
            Ok(st) => {
                let modified_at = st
                    .mtime
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0))
                    .unwrap_or_default();
                Ok(FileMetadata::new(st.size.unwrap_or(0), modified_at))
            }
            Err(e) => Err(classify(path, e)),
        }
    }

    fn mkdir(&mut self, path: &RemotePosixPath) -> Result<(), RemoteError> {
        self.sftp
            .mkdir(Path::new(path.as_str()), DIR_MODE)
            .map_err(|e| classify(path, e))
    }

    fn put(&mut self, contents: &mut dyn Read, path: &RemotePosixPath) -> Result<u64, RemoteError> {
        let mut file = self
            .sftp
            .create(Path::new(path.as_str()))
            .map_err(|e| classify(path, e))?;
        std::io::copy(contents, &mut file).map_err(|e| RemoteError::io(path, e))
    }
}
