//! rusqlite on a dedicated worker thread
//!
//! The connection is opened on, and never leaves, a named OS thread. Callers
//! send requests over a channel and await a oneshot reply, which keeps the
//! async runtime free of blocking SQLite calls at the cost of one message
//! round trip per statement.

use std::sync::mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};

use super::rusqlite_adapter::{open_connection, run_batch, run_statement};
use super::{
    prepare_db_file, BatchCommand, ConnectionOptions, DbAdapter, ResultSet, SqlValue,
    Transaction, TransactionFn,
};
use crate::error::{BenchError, Result};

const THREAD_NAME: &str = "sqlbench-worker";

enum Request {
    Execute {
        sql: String,
        params: Vec<SqlValue>,
        reply: oneshot::Sender<Result<ResultSet>>,
    },
    Batch {
        commands: Vec<BatchCommand>,
        reply: oneshot::Sender<Result<ResultSet>>,
    },
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}

fn worker_loop(mut conn: Connection, requests: mpsc::Receiver<Request>) {
    while let Ok(request) = requests.recv() {
        match request {
            Request::Execute { sql, params, reply } => {
                let _ = reply.send(run_statement(&conn, &sql, &params));
            }
            Request::Batch { commands, reply } => {
                let _ = reply.send(run_batch(&mut conn, &commands));
            }
            Request::Close { reply } => {
                let result = conn.close().map_err(|(_, e)| BenchError::from(e));
                let _ = reply.send(result);
                return;
            }
        }
    }
    debug!("Request channel closed, worker exiting");
}

async fn call<T>(
    requests: &mpsc::Sender<Request>,
    build: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
) -> Result<T> {
    let (reply, response) = oneshot::channel();
    requests
        .send(build(reply))
        .map_err(|_| BenchError::Worker("worker thread is gone".to_string()))?;
    response
        .await
        .map_err(|_| BenchError::Worker("worker dropped the reply".to_string()))?
}

async fn execute_on(
    requests: &mpsc::Sender<Request>,
    sql: &str,
    params: &[SqlValue],
) -> Result<ResultSet> {
    call(requests, |reply| Request::Execute {
        sql: sql.to_string(),
        params: params.to_vec(),
        reply,
    })
    .await
}

struct WorkerHandle {
    requests: mpsc::Sender<Request>,
    thread: JoinHandle<()>,
}

struct WorkerTransaction<'a> {
    requests: &'a mpsc::Sender<Request>,
    finished: bool,
}

impl WorkerTransaction<'_> {
    async fn finish(&mut self, outcome: Result<()>) -> Result<()> {
        let result = match outcome {
            Ok(()) => execute_on(self.requests, "COMMIT", &[]).await.map(|_| ()),
            Err(e) => Err(e),
        };
        // A failed COMMIT leaves the transaction open on the worker.
        if result.is_err() {
            self.rollback().await;
        }
        self.finished = true;
        result
    }

    async fn rollback(&self) {
        if let Err(rollback) = execute_on(self.requests, "ROLLBACK", &[]).await {
            warn!("Rollback failed: {}", rollback);
        }
    }
}

impl Drop for WorkerTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Nobody waits for this reply; the worker still runs it before
            // any later request.
            let (reply, _) = oneshot::channel();
            let _ = self.requests.send(Request::Execute {
                sql: "ROLLBACK".to_string(),
                params: Vec::new(),
                reply,
            });
        }
    }
}

#[async_trait]
impl Transaction for WorkerTransaction<'_> {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        execute_on(self.requests, sql, params).await
    }
}

/// Adapter whose rusqlite connection is owned by a background thread
pub struct WorkerAdapter {
    name: String,
    options: ConnectionOptions,
    worker: Mutex<Option<WorkerHandle>>,
}

impl WorkerAdapter {
    pub const NAME: &'static str = "rusqlite-worker";

    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            name: Self::NAME.to_string(),
            options,
            worker: Mutex::new(None),
        }
    }
}

#[async_trait]
impl DbAdapter for WorkerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self) -> Result<()> {
        let path = prepare_db_file(&self.options.directory, &self.name)?;
        let options = self.options.clone();
        let (requests, receiver) = mpsc::channel();
        let (ready, started) = oneshot::channel();

        debug!(adapter = %self.name, "Starting worker for {}", path.display());
        let thread = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || match open_connection(&path, &options) {
                Ok(conn) => {
                    let _ = ready.send(Ok(()));
                    worker_loop(conn, receiver);
                }
                Err(e) => {
                    let _ = ready.send(Err(e));
                }
            })?;

        started
            .await
            .map_err(|_| BenchError::Worker("worker exited during startup".to_string()))??;

        *self.worker.lock().await = Some(WorkerHandle { requests, thread });
        debug!(adapter = %self.name, "Setup done");
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ResultSet> {
        let guard = self.worker.lock().await;
        let worker = guard
            .as_ref()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        execute_on(&worker.requests, sql, params).await
    }

    async fn execute_batch(&self, commands: &[BatchCommand]) -> Result<ResultSet> {
        let guard = self.worker.lock().await;
        let worker = guard
            .as_ref()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;
        call(&worker.requests, |reply| Request::Batch {
            commands: commands.to_vec(),
            reply,
        })
        .await
    }

    async fn transaction(&self, body: TransactionFn<'_>) -> Result<()> {
        // Held for the whole transaction so no other statement interleaves
        let guard = self.worker.lock().await;
        let worker = guard
            .as_ref()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;

        execute_on(&worker.requests, "BEGIN", &[]).await?;
        let mut tx = WorkerTransaction {
            requests: &worker.requests,
            finished: false,
        };
        let outcome = body(&mut tx).await;
        tx.finish(outcome).await
    }

    async fn close(&self) -> Result<()> {
        let WorkerHandle { requests, thread } = self
            .worker
            .lock()
            .await
            .take()
            .ok_or_else(|| BenchError::not_initialized(&self.name))?;

        let closed = call(&requests, |reply| Request::Close { reply }).await;
        drop(requests);

        tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|e| BenchError::Worker(e.to_string()))?
            .map_err(|_| {
                error!("{} thread panicked", THREAD_NAME);
                BenchError::Worker(format!("{THREAD_NAME} thread panicked"))
            })?;

        closed?;
        debug!(adapter = %self.name, "Worker stopped");
        Ok(())
    }
}
