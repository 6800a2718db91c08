//! Audit trail fan-out for agent records.
//!
//! Agents expose a single callback slot per record kind. A sink attached with
//! [`attach_agent`] takes over those slots and persists everything they see.

use crate::agent::Agent;
use crate::scheduler::TaskScheduler;
use crate::types::{ChainOfThought, CyberEvent, Task, ToolExecution};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// One line of the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum AuditRecord {
    Thought(ChainOfThought),
    Event(CyberEvent),
    Tool(ToolExecution),
    TaskFinished(Task),
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Keeps records in memory, in arrival order.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

enum WriterMsg {
    Record(AuditRecord),
    Flush(oneshot::Sender<()>),
}

/// Append-only JSON Lines trail at `<dir>/audit.jsonl`.
///
/// Records go through an unbounded channel to a background writer task, so
/// [`record`](AuditSink::record) never blocks. Must be created inside a tokio runtime.
pub struct JsonlAuditSink {
    tx: mpsc::UnboundedSender<WriterMsg>,
    path: PathBuf,
}

impl JsonlAuditSink {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        let log_dir = log_dir.as_ref().to_path_buf();
        let path = log_dir.join("audit.jsonl");
        let (tx, mut rx) = mpsc::unbounded_channel::<WriterMsg>();

        let log_file = path.clone();
        tokio::spawn(async move {
            let opened = async {
                tokio::fs::create_dir_all(&log_dir).await?;
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_file)
                    .await
            }
            .await;
            let mut file = match opened {
                Ok(file) => Some(file),
                Err(e) => {
                    error!(path = %log_file.display(), error = %e, "Cannot open audit log");
                    None
                }
            };

            while let Some(msg) = rx.recv().await {
                match msg {
                    WriterMsg::Record(record) => {
                        let Some(f) = file.as_mut() else { continue };
                        match serde_json::to_string(&record) {
                            Ok(line) => {
                                let line = format!("{line}\n");
                                if let Err(e) = f.write_all(line.as_bytes()).await {
                                    error!(error = %e, "Audit write failed");
                                }
                            }
                            Err(e) => error!(error = %e, "Audit record not serializable"),
                        }
                    }
                    WriterMsg::Flush(done) => {
                        if let Some(f) = file.as_mut() {
                            let _ = f.flush().await;
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every record sent so far has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(WriterMsg::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: AuditRecord) {
        if self.tx.send(WriterMsg::Record(record)).is_err() {
            debug!("Audit writer stopped; record dropped");
        }
    }
}

/// Route an agent's thought and event callbacks into `sink`.
///
/// Replaces whatever handlers were registered on those slots.
pub fn attach_agent(agent: &Agent, sink: Arc<dyn AuditSink>) {
    let thoughts = Arc::clone(&sink);
    agent.set_chain_of_thought_callback(Arc::new(move |thought| {
        thoughts.record(AuditRecord::Thought(thought.clone()));
    }));
    agent.set_event_callback(Arc::new(move |event| {
        sink.record(AuditRecord::Event(event.clone()));
    }));
}

/// Record every successfully completed task.
pub fn attach_scheduler(scheduler: &TaskScheduler, sink: Arc<dyn AuditSink>) {
    scheduler.set_task_complete_callback(Arc::new(move |task, _event| {
        sink.record(AuditRecord::TaskFinished(task.clone()));
    }));
}

/// Copy an agent's tool log into `sink`. Returns the number of records written.
pub fn record_tool_log(agent: &Agent, sink: &dyn AuditSink) -> usize {
    let log = agent.tool_executions();
    let count = log.len();
    for execution in log {
        sink.record(AuditRecord::Tool(execution));
    }
    count
}
