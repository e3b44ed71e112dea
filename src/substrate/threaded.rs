//! Thread-per-task substrate.
//!
//! Each task entity runs on its own named thread and blocks on a private
//! `crossbeam_channel` inbox; it never polls. Task notifications and timer
//! ticks share one unbounded inbound channel, which is the runner's single
//! ordered queue. The ticker thread selects between a `crossbeam_channel::tick`
//! receiver and a stop channel so shutdown does not wait for the next tick.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, trace, warn};

use super::{EventSubstrate, TaskHandle};
use crate::error::SpawnError;
use crate::scheduler::event::{Event, Notice};
use crate::task::TaskEntity;

struct TaskThread {
    handle: TaskHandle,
    inbox: Option<Sender<Notice>>,
    join: Option<JoinHandle<()>>,
}

struct Ticker {
    stop: Sender<()>,
    join: JoinHandle<()>,
}

pub struct ThreadedSubstrate {
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    tasks: Vec<TaskThread>,
    ticker: Option<Ticker>,
}

impl ThreadedSubstrate {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            events_tx,
            events_rx,
            tasks: Vec::new(),
            ticker: None,
        }
    }

    /// Number of task threads not yet joined.
    pub fn live_threads(&self) -> usize {
        self.tasks.iter().filter(|t| t.join.is_some()).count()
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.stop.send(());
            if ticker.join.join().is_err() {
                warn!("ticker thread panicked");
            }
        }
    }
}

impl Default for ThreadedSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

fn task_main(
    mut entity: TaskEntity,
    handle: TaskHandle,
    inbox: Receiver<Notice>,
    events: Sender<Event>,
) {
    while let Ok(notice) = inbox.recv() {
        if let Some(emission) = entity.on_notice(notice) {
            if events.send(emission.into_event(handle)).is_err() {
                break;
            }
        }
        if entity.is_terminated() {
            break;
        }
    }
    trace!(task = %entity.id(), "task thread exiting");
}

impl EventSubstrate for ThreadedSubstrate {
    fn spawn(&mut self, entity: TaskEntity) -> Result<TaskHandle, SpawnError> {
        let handle = TaskHandle::from_raw(self.tasks.len() as u64);
        let task = entity.id();
        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        let events = self.events_tx.clone();
        let join = thread::Builder::new()
            .name(format!("task-{}", task.as_u32()))
            .spawn(move || task_main(entity, handle, inbox_rx, events))
            .map_err(|source| SpawnError::Thread { task, source })?;
        self.tasks.push(TaskThread {
            handle,
            inbox: Some(inbox_tx),
            join: Some(join),
        });
        debug!(%task, %handle, "task thread spawned");
        Ok(handle)
    }

    fn notify(&mut self, target: TaskHandle, notice: Notice) {
        let Some(slot) = self.tasks.get(target.raw() as usize) else {
            warn!(handle = %target, "notice for unknown handle dropped");
            return;
        };
        let delivered = slot
            .inbox
            .as_ref()
            .is_some_and(|inbox| inbox.send(notice).is_ok());
        if !delivered {
            trace!(handle = %target, ?notice, "task already exited, notice dropped");
        }
    }

    fn await_next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().ok()
    }

    fn reap_terminated(&mut self) -> Vec<TaskHandle> {
        let mut reaped = Vec::new();
        for slot in &mut self.tasks {
            let finished = slot.join.as_ref().is_some_and(JoinHandle::is_finished);
            if !finished {
                continue;
            }
            if let Some(join) = slot.join.take() {
                if join.join().is_err() {
                    warn!(handle = %slot.handle, "task thread panicked");
                }
            }
            slot.inbox = None;
            reaped.push(slot.handle);
        }
        reaped
    }

    fn schedule_periodic(&mut self, interval: Duration) -> io::Result<()> {
        self.stop_ticker();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let events = self.events_tx.clone();
        let join = thread::Builder::new()
            .name("ticker".to_string())
            .spawn(move || {
                let ticks = crossbeam_channel::tick(interval);
                loop {
                    let keep_going = select! {
                        recv(ticks) -> _ => events.send(Event::Tick).is_ok(),
                        recv(stop_rx) -> _ => false,
                    };
                    if !keep_going {
                        break;
                    }
                }
            })?;
        self.ticker = Some(Ticker {
            stop: stop_tx,
            join,
        });
        Ok(())
    }

    fn shutdown(&mut self) {
        self.stop_ticker();
        for slot in &mut self.tasks {
            if let Some(inbox) = slot.inbox.take() {
                let _ = inbox.send(Notice::Shutdown);
            }
        }
        for slot in &mut self.tasks {
            if let Some(join) = slot.join.take() {
                if join.join().is_err() {
                    warn!(handle = %slot.handle, "task thread panicked");
                }
            }
        }
    }
}

impl Drop for ThreadedSubstrate {
    fn drop(&mut self) {
        self.shutdown();
    }
}
