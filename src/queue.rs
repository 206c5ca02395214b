// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

// FIFO dispatch queue.
//
// Responsibilities:
// - Serialize all backend traffic: handlers enqueue, a single worker task
//   drains in arrival order, and at most one completion is in flight.
// - Poll with exponential backoff while idle so an empty queue costs
//   little, and reset the backoff the moment work appears.
// - Shape each finished answer into the completion form the waiting
//   handler asked for (full response or chunk sequence).

use crate::completer::{Completer, CompleterError};
use crate::openai::{ChatCompletionChunk, ChatCompletionResponse, ChatCompletionsPayload};
use crate::synth::{build_non_streaming, build_streaming, BuildOptions};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};

/// A finished completion, shaped for its waiting handler.
#[derive(Debug, Clone)]
pub enum Completion {
    Full(ChatCompletionResponse),
    /// The full chunk sequence; the handler replays it as SSE.
    Stream(Vec<ChatCompletionChunk>),
}

struct Task {
    payload: ChatCompletionsPayload,
    reply: oneshot::Sender<Result<Completion, CompleterError>>,
}

/// Handle for enqueuing work. Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct DispatchQueue {
    pending: Arc<Mutex<VecDeque<Task>>>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Append a request and get a receiver that resolves when the worker
    /// has completed it. The receiver errors only if the worker is gone.
    pub async fn enqueue(
        &self,
        payload: ChatCompletionsPayload,
    ) -> oneshot::Receiver<Result<Completion, CompleterError>> {
        let (reply, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        pending.push_back(Task { payload, reply });
        tracing::debug!(depth = pending.len(), "task enqueued");
        rx
    }

    async fn pop(&self) -> Option<Task> {
        self.pending.lock().await.pop_front()
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Idle backoff
// ---------------------------------------------------------------------------

const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(10);
const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Exponential poll interval for the idle worker.
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: BACKOFF_INITIAL,
        }
    }

    /// The delay to sleep now; the next one grows by the multiplier up to
    /// the cap.
    fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(BACKOFF_MULTIPLIER).min(BACKOFF_MAX);
        delay
    }

    fn reset(&mut self) {
        self.current = BACKOFF_INITIAL;
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Drain the queue forever. Spawn exactly one of these per process; it is
/// the only caller of `completer`, which is what makes the backend
/// single-flight.
pub async fn run_worker(queue: DispatchQueue, completer: Arc<dyn Completer>, opts: BuildOptions) {
    let mut backoff = Backoff::new();
    loop {
        let task = match queue.pop().await {
            Some(task) => task,
            None => {
                tokio::time::sleep(backoff.next()).await;
                continue;
            }
        };
        backoff.reset();

        let stream = task.payload.stream;
        tracing::debug!(model = %task.payload.model, stream, "task started");
        let result = completer.complete(&task.payload).await.map(|answer| {
            if stream {
                Completion::Stream(build_streaming(&task.payload, &answer, &opts))
            } else {
                Completion::Full(build_non_streaming(&task.payload, &answer, &opts))
            }
        });
        if let Err(err) = &result {
            tracing::warn!(error = %err, "task failed");
        }
        // The handler may have hung up; a dead receiver is not an error.
        let _ = task.reply.send(result);
    }
}
