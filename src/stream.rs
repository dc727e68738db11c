//! Streaming engine: persistent connection, automatic reconnect, decode.
//!
//! A stream runs two background tasks. The reader task owns the HTTP
//! connection: it re-signs and re-sends the request on every (re)connect,
//! frames the body into records and pushes them onto an internal raw
//! channel. The decode task pulls raw records, decodes them into the
//! caller's type and pushes them onto the public queue. The only mutable
//! state shared between the two is that one-directional channel.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt as _;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::Result;
use crate::client::Client;
use crate::decode;
use crate::error::{Error, Kind};
use crate::reader::RecordReader;
use crate::request::{Endpoint, Prepared, classify};
use crate::retry::Attempt;

/// Capacity of the raw-record and output channels. One slot is the
/// smallest a tokio channel allows; a slow consumer therefore stalls the
/// reader task, which is the intended backpressure.
const CHANNEL_CAPACITY: usize = 1;

type LastError = Arc<Mutex<Option<Error>>>;

/// Handle to an active stream.
///
/// Decoded messages are read off the handle until the queue closes, which
/// happens when [`TweetStream::stop`] is called or the stream terminates on
/// its own (reconnect budget exhausted, or a fatal decode failure — see
/// [`TweetStream::take_error`]).
///
/// The handle also implements [`futures::Stream`].
pub struct TweetStream<T> {
    messages: mpsc::Receiver<T>,
    done: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    last_error: LastError,
}

impl<T> TweetStream<T> {
    /// Receives the next decoded message; `None` once the stream has
    /// terminated.
    pub async fn next_message(&mut self) -> Option<T> {
        self.messages.recv().await
    }

    /// Signals both background tasks to stop, unblocks any pending body
    /// read or channel send, and waits for the tasks to finish.
    ///
    /// Calling `stop` more than once is a no-op.
    pub async fn stop(&mut self) {
        self.done.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                debug!(error = %e, "stream task failed during shutdown");
            }
        }
    }

    /// The fatal error that terminated the stream, if any.
    ///
    /// A stream that ended because of [`TweetStream::stop`] or a clean end
    /// of body leaves no error behind, so callers can distinguish failure
    /// from an intentional stop.
    pub fn take_error(&self) -> Option<Error> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<T> futures::Stream for TweetStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().messages.poll_recv(cx)
    }
}

impl<T> Drop for TweetStream<T> {
    fn drop(&mut self) {
        // a dropped handle must not leave the tasks connected forever
        self.done.cancel();
    }
}

impl Client {
    /// Connects to a streaming endpoint and returns a handle delivering
    /// decoded messages.
    ///
    /// The handle is usable immediately; connection establishment and every
    /// reconnect happen in the background. Must be called within a tokio
    /// runtime.
    pub fn stream<Req, T>(&self, endpoint: &Endpoint, payload: Option<&Req>) -> Result<TweetStream<T>>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        let prepared = self.prepare(endpoint, payload)?;
        let done = CancellationToken::new();
        let (raw_tx, raw_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let last_error: LastError = Arc::new(Mutex::new(None));

        let reader = ReaderTask {
            client: self.clone(),
            budget: self.config.retry_budget(),
            prepared,
            raw_tx,
            done: done.clone(),
            last_error: Arc::clone(&last_error),
        };
        let tasks = vec![
            tokio::spawn(reader.run()),
            tokio::spawn(decode_loop::<T>(
                raw_rx,
                msg_tx,
                done.clone(),
                Arc::clone(&last_error),
            )),
        ];

        Ok(TweetStream {
            messages: msg_rx,
            done,
            tasks,
            last_error,
        })
    }
}

/// How one connection cycle ended.
enum Outcome {
    /// The done signal fired
    Stopped,
    /// The body ended cleanly
    Ended,
    /// Signing, sending or reading failed
    Failed(Error),
}

/// The connect/reconnect task: owns the signed request, the response and
/// the body for as long as a connection is active.
struct ReaderTask {
    client: Client,
    budget: u32,
    prepared: Prepared,
    raw_tx: mpsc::Sender<Bytes>,
    done: CancellationToken,
    last_error: LastError,
}

impl ReaderTask {
    async fn run(mut self) {
        // dropping raw_tx on return closes the decode task's input
        let mut attempts = 0_u32;

        loop {
            if self.done.is_cancelled() {
                return;
            }
            attempts += 1;

            let request = match self.client.sign(&self.prepared) {
                Ok(request) => request,
                Err(error) => {
                    error!(%error, "failed to sign stream request");
                    self.record(error);
                    return;
                }
            };

            let (outcome, connected) = self.connect_and_receive(request).await;
            if connected {
                // a connection that entered Receiving resets the budget;
                // this disconnect starts a fresh failure cycle
                attempts = 1;
            }

            let (failure, genuine) = match outcome {
                Outcome::Stopped => return,
                Outcome::Ended => (Error::stream("streaming response body ended"), false),
                Outcome::Failed(error) => (error, true),
            };

            let attempt = Attempt {
                kind: failure.kind(),
                status: failure.status_code(),
                attempts,
            };
            let retry = failure.is_retryable()
                && attempts <= self.budget
                && self.client.retryer().should_retry(&attempt);
            if !retry {
                if genuine {
                    error!(error = %failure, "stream request cannot be retried");
                    self.record(failure);
                } else {
                    debug!("streaming response body ended; not reconnecting");
                }
                return;
            }

            warn!(error = %failure, attempts, "stream disconnected, reconnecting");
            let delay = self.client.retryer().retry_rules(&attempt);
            tokio::select! {
                () = self.done.cancelled() => return,
                () = sleep(delay) => {}
            }
        }
    }

    /// One connection cycle: send the signed request, then feed records
    /// into the raw channel until the body ends or the done signal fires.
    /// The second return value reports whether Receiving was entered.
    async fn connect_and_receive(&mut self, request: reqwest::Request) -> (Outcome, bool) {
        let response = tokio::select! {
            () = self.done.cancelled() => return (Outcome::Stopped, false),
            result = self.client.config.http_client.execute(request) => result,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => return (Outcome::Failed(Error::transport(e)), false),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return (Outcome::Failed(Error::transport(e)), false),
            };
            let error = classify(&self.prepared, status, &body).unwrap_or_else(|| {
                Error::status(
                    status,
                    self.prepared.method.clone(),
                    self.prepared.path.clone(),
                    format!(
                        "an error occurred in sending a request to {}",
                        self.prepared.endpoint
                    ),
                )
            });
            return (Outcome::Failed(error), false);
        }

        let chunks = Box::pin(
            response
                .bytes_stream()
                .map(|result| result.map_err(|e| Error::with_source(Kind::Stream, e))),
        );
        let mut reader = RecordReader::new(chunks);

        loop {
            let next = tokio::select! {
                () = self.done.cancelled() => return (Outcome::Stopped, true),
                next = reader.read_next() => next,
            };
            match next {
                Ok(Some(record)) => {
                    if record.is_empty() {
                        // keep-alive: resets liveness, carries no payload
                        continue;
                    }
                    tokio::select! {
                        () = self.done.cancelled() => return (Outcome::Stopped, true),
                        sent = self.raw_tx.send(record) => {
                            if sent.is_err() {
                                // decode task is gone
                                return (Outcome::Stopped, true);
                            }
                        }
                    }
                }
                Ok(None) => return (Outcome::Ended, true),
                Err(error) => return (Outcome::Failed(error), true),
            }
        }
    }

    fn record(&self, error: Error) {
        let mut guard = self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get_or_insert(error);
    }
}

/// The decode task: raw records in, decoded messages out, wire order
/// preserved. A decode failure is a protocol violation and terminates the
/// whole stream, reader included.
async fn decode_loop<T>(
    mut raw_rx: mpsc::Receiver<Bytes>,
    msg_tx: mpsc::Sender<T>,
    done: CancellationToken,
    last_error: LastError,
) where
    T: DeserializeOwned + Send + 'static,
{
    while let Some(record) = raw_rx.recv().await {
        match decode::decode_record::<T>(&record) {
            Ok(message) => {
                tokio::select! {
                    () = done.cancelled() => return,
                    sent = msg_tx.send(message) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                let failure = Error::decode(None, e);
                error!(error = %failure, "failed to decode streaming record; stopping stream");
                last_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(failure);
                done.cancel();
                return;
            }
        }
    }
}
