//! Partition-parallel query runner
//!
//! One executor per input partition, each on its own blocking task and each
//! writing into its own bounded channel. A full channel blocks the producer;
//! dropping a receiver cancels that partition at its next write.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ExecutionConfig;
use crate::encoder::{ChannelSink, Frame};
use crate::errors::{StructuredError, UdtfResult};
use crate::functions::TableFunction;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::schema::Row;

use super::cancel::CancellationFlag;
use super::executor::{ExecutionSummary, TableFunctionExecutor};

/// Output stream of one running partition
#[derive(Debug)]
pub struct PartitionStream {
    pub index: usize,
    pub frames: mpsc::Receiver<Frame>,
    handle: JoinHandle<UdtfResult<ExecutionSummary>>,
}

impl PartitionStream {
    /// Waits for the partition's executor to finish
    pub async fn finish(self) -> UdtfResult<ExecutionSummary> {
        drop(self.frames);
        join(self.handle).await
    }
}

/// Everything one partition produced
#[derive(Debug)]
pub struct PartitionOutput {
    pub index: usize,
    pub frames: Vec<Frame>,
    pub result: UdtfResult<ExecutionSummary>,
}

/// Runs a table function over partitioned input
#[derive(Debug, Clone)]
pub struct QueryRunner {
    config: ExecutionConfig,
    metrics: Arc<MetricsRegistry>,
    cancel: CancellationFlag,
}

impl QueryRunner {
    pub fn new(config: ExecutionConfig) -> Self {
        Self::with_metrics(config, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(config: ExecutionConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            config,
            metrics,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Flag shared by every partition this runner starts
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Requests that every running partition stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Starts one executor per partition.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, function: &TableFunction, partitions: Vec<Vec<Row>>) -> Vec<PartitionStream> {
        let partition_count = partitions.len().to_string();
        log_event(
            Event::QueryBegin,
            &[
                ("encoding", self.config.encoding_mode().as_str()),
                ("function", function.name()),
                ("partitions", partition_count.as_str()),
            ],
        );

        partitions
            .into_iter()
            .enumerate()
            .map(|(index, inputs)| {
                let (sink, frames) = ChannelSink::bounded(self.config.output_buffer_frames);
                let mut executor = TableFunctionExecutor::with_metrics(
                    function,
                    &self.config,
                    sink,
                    Arc::clone(&self.metrics),
                )
                .with_cancellation(self.cancel.clone());
                let handle = tokio::task::spawn_blocking(move || executor.run(inputs));
                PartitionStream {
                    index,
                    frames,
                    handle,
                }
            })
            .collect()
    }

    /// Runs every partition to completion, collecting their frames
    pub async fn collect(
        &self,
        function: &TableFunction,
        partitions: Vec<Vec<Row>>,
    ) -> Vec<PartitionOutput> {
        let drains: Vec<JoinHandle<PartitionOutput>> = self
            .start(function, partitions)
            .into_iter()
            .map(|mut stream| {
                tokio::spawn(async move {
                    let mut frames = Vec::new();
                    while let Some(frame) = stream.frames.recv().await {
                        frames.push(frame);
                    }
                    PartitionOutput {
                        index: stream.index,
                        frames,
                        result: join(stream.handle).await,
                    }
                })
            })
            .collect();

        let mut outputs = Vec::with_capacity(drains.len());
        for (index, drain) in drains.into_iter().enumerate() {
            let output = drain.await.unwrap_or_else(|e| PartitionOutput {
                index,
                frames: Vec::new(),
                result: Err(StructuredError::internal(format!("partition task failed: {}", e))),
            });
            outputs.push(output);
        }

        let failed = outputs.iter().filter(|o| o.result.is_err()).count().to_string();
        let output_rows = outputs
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(ExecutionSummary::output_rows)
            .sum::<u64>()
            .to_string();
        log_event(
            Event::QueryComplete,
            &[
                ("failed_partitions", failed.as_str()),
                ("function", function.name()),
                ("output_rows", output_rows.as_str()),
            ],
        );
        outputs
    }
}

async fn join(handle: JoinHandle<UdtfResult<ExecutionSummary>>) -> UdtfResult<ExecutionSummary> {
    handle
        .await
        .map_err(|e| StructuredError::internal(format!("executor task failed: {}", e)))?
}
