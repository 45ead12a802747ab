//! Response body that pipes transcoder stdout straight to the client.
//!
//! Reads only happen when hyper polls for the next chunk, so a slow client
//! fills the pipe and blocks the transcoder's writes. Whatever ends the body
//! (EOF, read error, server shutdown, or the body being dropped because the
//! client went away) releases the subprocess exactly once.

use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use bytes::Bytes;
use futures::{Future, Stream};
use tokio::process::ChildStdout;
use tokio_util::{
    io::ReaderStream,
    sync::{CancellationToken, WaitForCancellationFutureOwned},
};
use tracing::{debug, info, warn};

use crate::{
    common::{errors::RelayError, types::StreamId},
    relay::{
        process::{ActiveStreams, MixerProcess, TerminationReason},
        topology::MixingTopology,
    },
};

/// Read size for stdout chunks. Roughly 170 ms of 192 kbps MP3.
const CHUNK_SIZE: usize = 4 * 1024;

pub struct RelayStream {
    id: StreamId,
    stdout: ReaderStream<ChildStdout>,
    process: Option<MixerProcess>,
    grace: Duration,
    server_shutdown: Pin<Box<WaitForCancellationFutureOwned>>,
    bytes_sent: u64,
}

impl RelayStream {
    /// Spawns the transcoder for `topology`. Fails only if the process could
    /// not be started, before anything has been written to the client.
    pub fn open(
        id: StreamId,
        topology: &Arc<MixingTopology>,
        grace: Duration,
        active: &ActiveStreams,
        server_shutdown: CancellationToken,
    ) -> Result<Self, RelayError> {
        info!("[{}] starting transcoder: {}", id, topology.command_line());
        Self::spawn(
            id,
            &topology.program,
            &topology.ffmpeg_args(),
            grace,
            active,
            server_shutdown,
        )
    }

    pub fn spawn(
        id: StreamId,
        program: &str,
        args: &[String],
        grace: Duration,
        active: &ActiveStreams,
        server_shutdown: CancellationToken,
    ) -> Result<Self, RelayError> {
        let (process, stdout) = MixerProcess::spawn(id, program, args, active)?;
        debug!("[{}] relaying stdout of pid {:?}", id, process.pid());

        Ok(Self {
            id,
            stdout: ReaderStream::with_capacity(stdout, CHUNK_SIZE),
            process: Some(process),
            grace,
            server_shutdown: Box::pin(server_shutdown.cancelled_owned()),
            bytes_sent: 0,
        })
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn is_finished(&self) -> bool {
        self.process.is_none()
    }

    /// Hands the process to a background shutdown. Later calls do nothing.
    fn finish(&mut self, reason: TerminationReason) {
        let Some(process) = self.process.take() else {
            return;
        };

        debug!(
            "[{}] relay ending ({}) after {} bytes",
            self.id, reason, self.bytes_sent
        );

        let grace = self.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    process.shutdown(reason, grace).await;
                });
            }
            Err(_) => {
                warn!(
                    "[{}] no runtime to shut the transcoder down, killing it on drop",
                    self.id
                );
                drop(process);
            }
        }
    }
}

impl Stream for RelayStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.process.is_none() {
            return Poll::Ready(None);
        }

        if this.server_shutdown.as_mut().poll(cx).is_ready() {
            this.finish(TerminationReason::ServerShutdown);
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.stdout).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!("[{}] failed reading transcoder output: {}", this.id, e);
                this.finish(TerminationReason::SubprocessError);
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                this.finish(TerminationReason::SubprocessExit);
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        self.finish(TerminationReason::ClientClosed);
    }
}
