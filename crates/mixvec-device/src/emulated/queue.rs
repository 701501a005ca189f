//! Worker-thread execution queues.
//!
//! Each [`EmulatedQueue`] owns one worker thread that drains copy
//! commands from an unbounded crossbeam channel in FIFO order. A fence
//! carries a bounded(1) reply channel; the worker acknowledges it once
//! every earlier command has run, which is how [`ExecutionQueue::wait`]
//! blocks until the queue is drained.

use std::ptr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use log::trace;
use mixvec_core::DeviceId;

use crate::config::PlatformConfig;
use crate::error::{ConfigError, DeviceError};
use crate::queue::{CopyCommand, ExecutionQueue, QueueRegistry};

/// A unit of work for a queue worker.
enum QueueTask {
    Copy(CopyCommand),
    Fence(Sender<()>),
}

/// In-order execution queue for one emulated device.
pub struct EmulatedQueue {
    device: DeviceId,
    sender: Option<Sender<QueueTask>>,
    worker: Option<JoinHandle<()>>,
}

impl EmulatedQueue {
    /// Spawn the worker thread for `device`.
    pub fn spawn(device: DeviceId) -> Result<Self, ConfigError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name(format!("mixvec-queue-{}", device.0))
            .spawn(move || worker_loop(device, receiver))
            .map_err(|e| ConfigError::WorkerSpawnFailed {
                device,
                reason: e.to_string(),
            })?;
        Ok(Self {
            device,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn send(&self, task: QueueTask) -> Result<(), DeviceError> {
        let closed = DeviceError::QueueClosed {
            device: self.device,
        };
        match &self.sender {
            Some(sender) => sender.send(task).map_err(|_| closed),
            None => Err(closed),
        }
    }
}

impl ExecutionQueue for EmulatedQueue {
    fn device(&self) -> DeviceId {
        self.device
    }

    unsafe fn enqueue(&self, command: CopyCommand) -> Result<(), DeviceError> {
        self.send(QueueTask::Copy(command))
    }

    fn wait(&self) -> Result<(), DeviceError> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(QueueTask::Fence(ack_tx))?;
        ack_rx.recv().map_err(|_| DeviceError::QueueClosed {
            device: self.device,
        })
    }
}

impl Drop for EmulatedQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish queued work and exit.
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Main loop of a queue worker. Runs until the channel is closed.
fn worker_loop(device: DeviceId, tasks: Receiver<QueueTask>) {
    while let Ok(task) = tasks.recv() {
        match task {
            QueueTask::Copy(command) => {
                trace!(
                    "{device}: {:?} copy of {} bytes",
                    command.direction,
                    command.bytes
                );
                // SAFETY: the enqueuer guaranteed both regions are valid,
                // non-overlapping and untouched until the next fence is
                // acknowledged, and fences are processed in FIFO order
                // after this command.
                unsafe {
                    ptr::copy_nonoverlapping(
                        command.src.as_ptr(),
                        command.dst.as_ptr(),
                        command.bytes,
                    );
                }
            }
            QueueTask::Fence(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// [`QueueRegistry`] holding one [`EmulatedQueue`] per device.
pub struct EmulatedRegistry {
    queues: IndexMap<DeviceId, Arc<EmulatedQueue>>,
}

impl EmulatedRegistry {
    /// Spawn a queue for every device in `config`.
    pub fn new(config: &PlatformConfig) -> Result<Self, ConfigError> {
        let mut queues = IndexMap::with_capacity(config.device_count as usize);
        for i in 0..config.device_count {
            let device = DeviceId(i);
            queues.insert(device, Arc::new(EmulatedQueue::spawn(device)?));
        }
        Ok(Self { queues })
    }
}

impl QueueRegistry for EmulatedRegistry {
    fn device_count(&self) -> u32 {
        self.queues.len() as u32
    }

    fn queue(&self, device: DeviceId) -> Result<Arc<dyn ExecutionQueue>, DeviceError> {
        match self.queues.get(&device) {
            Some(queue) => Ok(Arc::clone(queue) as Arc<dyn ExecutionQueue>),
            None => Err(DeviceError::UnknownDevice {
                device,
                device_count: self.device_count(),
            }),
        }
    }
}
