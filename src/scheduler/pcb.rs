//! Process control blocks and the table that owns them.
//!
//! The table is owned exclusively by the controller. Task entities never see
//! it; they only send notifications that cause the controller to mutate it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::substrate::TaskHandle;

/// Stable PCB index in `0..N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(u32);

impl TaskId {
    #[inline(always)]
    pub fn from_u32(id: u32) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PCB[{}]", self.0)
    }
}

/// Scheduling state of a PCB. `Done` is absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Ready,
    Running,
    Sleep,
    Done,
}

impl TaskState {
    /// Whether the task can still be scheduled or woken.
    #[inline(always)]
    pub fn is_alive(self) -> bool {
        self != Self::Done
    }
}

/// Per-task scheduling record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pcb {
    pub id: TaskId,
    pub handle: TaskHandle,
    pub state: TaskState,
    pub quantum_remaining: u32,
    /// Epochs observed in READY. Never decreases.
    pub wait_time: u64,
    /// Permission notices delivered.
    pub grants: u64,
    /// I/O requests honoured.
    pub io_blocks: u64,
}

/// Authoritative PCB storage, indexed by `TaskId` and reverse-mapped by handle.
#[derive(Clone, Debug)]
pub struct PcbTable {
    pcbs: Vec<Pcb>,
    by_handle: HashMap<TaskHandle, TaskId>,
}

impl PcbTable {
    /// Create one READY PCB per handle, in order, each with a full quantum.
    pub fn new(handles: &[TaskHandle], base_quantum: u32) -> Self {
        let mut pcbs = Vec::with_capacity(handles.len());
        let mut by_handle = HashMap::with_capacity(handles.len());
        for (idx, &handle) in handles.iter().enumerate() {
            let id = TaskId::from_u32(idx as u32);
            pcbs.push(Pcb {
                id,
                handle,
                state: TaskState::Ready,
                quantum_remaining: base_quantum,
                wait_time: 0,
                grants: 0,
                io_blocks: 0,
            });
            by_handle.insert(handle, id);
        }
        Self { pcbs, by_handle }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    /// Map an external handle back to its PCB.
    #[inline]
    pub fn lookup(&self, handle: TaskHandle) -> Option<TaskId> {
        self.by_handle.get(&handle).copied()
    }

    #[inline(always)]
    pub fn get(&self, id: TaskId) -> &Pcb {
        &self.pcbs[id.index()]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: TaskId) -> &mut Pcb {
        &mut self.pcbs[id.index()]
    }

    #[inline(always)]
    pub fn state(&self, id: TaskId) -> TaskState {
        self.pcbs[id.index()].state
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pcb> {
        self.pcbs.iter_mut()
    }

    pub fn count_in(&self, state: TaskState) -> usize {
        self.pcbs.iter().filter(|p| p.state == state).count()
    }
}
