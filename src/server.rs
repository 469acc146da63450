//! Development coordination server.
//!
//! Serves a [`MemoryTree`] over TCP using the zkchroot frame protocol. Each
//! accepted connection gets its own thread and its own [`MemorySession`];
//! all sessions share the tree.

use crate::client::Transport;
use crate::error::{Error, Result};
use crate::tree::{MemorySession, MemoryTree};
use std::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use zkchroot_protocol::{
    decode_message, read_frame, write_frame, ErrorCode, Request, Response, PROTOCOL_VERSION,
};

/// Accept connections forever, serving `tree`.
pub fn serve(listener: TcpListener, tree: MemoryTree) -> Result<()> {
    info!(address = %listener.local_addr()?, "listening");

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                let session = tree.session();
                std::thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, session) {
                        warn!(%peer, error = %e, "connection error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept error");
            }
        }
    }
}

/// Handle requests on one connection until `Close` or end of stream.
fn handle_connection(mut stream: TcpStream, mut session: MemorySession) -> Result<()> {
    let result = serve_requests(&mut stream, &mut session);
    session.close()?;
    result
}

fn serve_requests(stream: &mut TcpStream, session: &mut MemorySession) -> Result<()> {
    loop {
        let Some(payload) = read_frame(stream)? else {
            debug!("connection closed");
            return Ok(());
        };

        let request: Request = match decode_message(&payload) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "invalid request");
                write_frame(
                    stream,
                    &Response::error(ErrorCode::InvalidRequest, format!("invalid request: {}", e)),
                )?;
                continue;
            }
        };

        debug!(?request, "received request");

        let closing = matches!(request, Request::Close);
        let response = handle_request(session, request);
        write_frame(stream, &response)?;

        if closing {
            debug!("session closed by client");
            return Ok(());
        }
    }
}

/// Handle a single request.
fn handle_request(session: &mut MemorySession, request: Request) -> Response {
    let result = match request {
        Request::Ping => Ok(Response::Pong {
            version: PROTOCOL_VERSION,
        }),
        Request::Exists { path } => session
            .exists(&path)
            .map(|exists| Response::Exists { exists }),
        Request::Create { path, data } => session
            .create(&path, &data)
            .map(|path| Response::Created { path }),
        Request::GetData { path } => session.get_data(&path).map(|data| Response::Data { data }),
        Request::SetData { path, data } => session.set_data(&path, &data).map(|()| Response::Ok),
        Request::Delete { path } => session.delete(&path).map(|()| Response::Ok),
        Request::GetChildren { path } => session
            .get_children(&path)
            .map(|children| Response::Children { children }),
        Request::Close => Ok(Response::Ok),
    };

    result.unwrap_or_else(error_response)
}

fn error_response(err: Error) -> Response {
    let code = match &err {
        Error::NoNode { .. } => ErrorCode::NoNode,
        Error::NodeExists { .. } => ErrorCode::NodeExists,
        Error::NotEmpty { .. } => ErrorCode::NotEmpty,
        Error::InvalidPath { .. } => ErrorCode::BadArguments,
        _ => ErrorCode::InvalidRequest,
    };
    Response::error(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_request_maps_errors() {
        let tree = MemoryTree::new();
        let mut session = tree.session();

        assert_eq!(
            handle_request(&mut session, Request::Ping),
            Response::Pong {
                version: PROTOCOL_VERSION
            }
        );
        assert_eq!(
            handle_request(
                &mut session,
                Request::Create {
                    path: "/a".into(),
                    data: b"x".to_vec()
                }
            ),
            Response::Created { path: "/a".into() }
        );

        let codes = [
            (Request::GetData { path: "/nope".into() }, ErrorCode::NoNode),
            (
                Request::Create {
                    path: "/a".into(),
                    data: vec![],
                },
                ErrorCode::NodeExists,
            ),
            (Request::Exists { path: "bad".into() }, ErrorCode::BadArguments),
        ];
        for (request, expected) in codes {
            match handle_request(&mut session, request) {
                Response::Error { code, .. } => assert_eq!(code, expected),
                other => panic!("expected {:?}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_not_empty_delete() {
        let tree = MemoryTree::new();
        tree.mkdir_p("/a/b").unwrap();
        let mut session = tree.session();
        match handle_request(&mut session, Request::Delete { path: "/a".into() }) {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::NotEmpty),
            other => panic!("expected NOT_EMPTY, got {:?}", other),
        }
    }
}
