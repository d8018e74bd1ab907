use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::lsp::backend::Backend;
use crate::lsp::dispatcher::{Dispatcher, LoopControl, ServerState};
use crate::rpc::codec::{decode, encode, encode_notification};
use crate::rpc::message::{Notification, Response};
use crate::rpc::transport::{FrameError, FrameReader, FrameWriter, ReaderLimits};

/// Failures that end the server loop
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Transport failure: {0}")]
    Transport(#[from] std::io::Error),
}

/// Drives reader, codec, dispatcher and writer over one byte stream pair.
pub struct Server<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    dispatcher: Dispatcher,
    state: ServerState,
}

impl<R, W> Server<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W, limits: ReaderLimits, dispatcher: Dispatcher) -> Self {
        Self {
            reader: FrameReader::new(input, limits),
            writer: FrameWriter::new(output),
            dispatcher,
            state: ServerState::default(),
        }
    }

    /// Serves frames until end of stream or `exit`.
    ///
    /// Framing and decode errors drop one frame and keep the loop running;
    /// only I/O failures on either stream end it with an error.
    pub async fn serve(&mut self) -> Result<(), ServerError> {
        loop {
            let frame = match self.reader.next_frame().await {
                Ok(frame) => frame,
                Err(FrameError::EndOfStream) => {
                    info!("Input stream closed");
                    return Ok(());
                }
                Err(FrameError::Io(e)) => {
                    error!("Failed to read from input stream: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Dropping frame: {}", e);
                    continue;
                }
            };

            let message = match decode(&frame.body) {
                Ok(message) => message,
                Err(e) => {
                    warn!(content_length = frame.content_length, "Failed to decode message: {}", e);
                    if let Some(response) = e.to_response() {
                        self.write_response(&response).await?;
                    }
                    continue;
                }
            };

            let dispatched = self.dispatcher.dispatch(message, self.state).await;
            self.state = dispatched.state;

            for notification in &dispatched.notifications {
                self.write_notification(notification).await?;
            }
            if let Some(response) = &dispatched.response {
                self.write_response(response).await?;
            }

            if dispatched.control == LoopControl::Exit {
                info!("Exit requested, stopping server loop");
                return Ok(());
            }
        }
    }

    async fn write_response(&mut self, response: &Response) -> Result<(), ServerError> {
        match encode(response) {
            Ok(framed) => {
                debug!(id = %response.id, is_error = response.is_error(), "Writing response");
                self.writer.write_frame(&framed).await?;
            }
            Err(e) => error!(id = %response.id, "Failed to encode response: {}", e),
        }
        Ok(())
    }

    async fn write_notification(&mut self, notification: &Notification) -> Result<(), ServerError> {
        match encode_notification(notification) {
            Ok(framed) => {
                debug!(method = %notification.method, "Writing notification");
                self.writer.write_frame(&framed).await?;
            }
            Err(e) => error!(method = %notification.method, "Failed to encode notification: {}", e),
        }
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

/// Builds the default dispatcher: every handler of [`Backend`].
pub fn default_dispatcher(config: &ServerConfig) -> Dispatcher {
    Dispatcher::new(Arc::new(Backend::new()).router()).with_request_timeout(config.request_timeout)
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!("Starting dedukt-lsp server");

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let mut server = Server::new(stdin, stdout, config.reader_limits, default_dispatcher(&config));
    server.serve().await?;

    info!("dedukt-lsp server stopped");
    Ok(())
}
