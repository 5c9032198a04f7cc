// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Request/response exchange over TCP.
//!
//! Every message is a JSON document preceded by its length as a 4-byte
//! big-endian integer. A connection carries any number of request/response
//! exchanges; the client side opens one connection per call.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Upper bound on a single frame, checked before allocating the buffer
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    #[error("connection closed by peer")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub async fn write_frame<W, T>(stream: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let serialized = serde_json::to_vec(message)?;
    if serialized.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(serialized.len()));
    }
    let len = serialized.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&serialized).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_frame<R, T>(stream: &mut R) -> Result<T, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await.map_err(closed_on_eof)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut buffer = vec![0u8; len];
    stream.read_exact(&mut buffer).await.map_err(closed_on_eof)?;
    Ok(serde_json::from_slice(&buffer)?)
}

fn closed_on_eof(e: std::io::Error) -> TransportError {
    if e.kind() == ErrorKind::UnexpectedEof {
        TransportError::Closed
    } else {
        TransportError::Io(e)
    }
}

/// One request/response exchange on a fresh connection.
/// `timeout` bounds connect + exchange together.
pub async fn call<Req, Resp>(
    addr: SocketAddr,
    request: &Req,
    timeout: Option<Duration>,
) -> Result<Resp, TransportError>
where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
{
    let exchange = async {
        let mut stream = TcpStream::connect(addr).await?;
        write_frame(&mut stream, request).await?;
        read_frame(&mut stream).await
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => exchange.await,
    }
}

/// Server-side half of the exchange
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: DeserializeOwned + Send;
    type Response: Serialize + Send + Sync;

    async fn handle(&self, request: Self::Request, peer: SocketAddr) -> Self::Response;
}

/// Accepts connections until `cancel` fires. Each connection is served on its
/// own task; a broken connection only ends that task.
pub async fn serve<H>(listener: TcpListener, handler: Arc<H>, cancel: CancellationToken)
where
    H: RequestHandler,
{
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let handler = handler.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = serve_connection(stream, peer, handler) => {}
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to accept connection");
            }
        }
    }
}

async fn serve_connection<H>(mut stream: TcpStream, peer: SocketAddr, handler: Arc<H>)
where
    H: RequestHandler,
{
    loop {
        let request: H::Request = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(TransportError::Closed) => return,
            Err(e) => {
                tracing::debug!(%peer, error = %e, "dropping connection");
                return;
            }
        };

        let response = handler.handle(request, peer).await;
        if let Err(e) = write_frame(&mut stream, &response).await {
            tracing::debug!(%peer, error = %e, "failed to send response");
            return;
        }
    }
}
