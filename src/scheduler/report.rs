//! Final per-task statistics, produced once the population reaches zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pcb::{PcbTable, TaskId};
use crate::substrate::TaskHandle;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub handle: TaskHandle,
    pub wait_time: u64,
    pub grants: u64,
    pub io_blocks: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub base_quantum: u32,
    /// Epoch at which the last task terminated.
    pub epochs: u64,
    pub tasks: Vec<TaskSummary>,
    /// Arithmetic mean of `wait_time` over every task.
    pub mean_wait: f64,
}

impl Report {
    pub(crate) fn from_table(table: &PcbTable, base_quantum: u32, epochs: u64) -> Self {
        let tasks: Vec<TaskSummary> = table
            .iter()
            .map(|pcb| TaskSummary {
                id: pcb.id,
                handle: pcb.handle,
                wait_time: pcb.wait_time,
                grants: pcb.grants,
                io_blocks: pcb.io_blocks,
            })
            .collect();
        let total: u64 = tasks.iter().map(|t| t.wait_time).sum();
        let mean_wait = if tasks.is_empty() {
            0.0
        } else {
            total as f64 / tasks.len() as f64
        };
        Self {
            base_quantum,
            epochs,
            tasks,
            mean_wait,
        }
    }

    pub fn total_wait(&self) -> u64 {
        self.tasks.iter().map(|t| t.wait_time).sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== all tasks finished (epoch {}) ===", self.epochs)?;
        for task in &self.tasks {
            writeln!(
                f,
                "{} handle:{} wait:{} grants:{} io:{}",
                task.id, task.handle, task.wait_time, task.grants, task.io_blocks
            )?;
        }
        write!(f, "mean wait: {:.2} epochs", self.mean_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_is_arithmetic_average() {
        let handles = [
            TaskHandle::from_raw(0),
            TaskHandle::from_raw(1),
            TaskHandle::from_raw(2),
        ];
        let mut table = PcbTable::new(&handles, 2);
        table.get_mut(TaskId::from_u32(0)).wait_time = 1;
        table.get_mut(TaskId::from_u32(1)).wait_time = 2;
        table.get_mut(TaskId::from_u32(2)).wait_time = 6;
        let report = Report::from_table(&table, 2, 12);
        assert_eq!(report.total_wait(), 9);
        assert!((report.mean_wait - 3.0).abs() < f64::EPSILON);
        assert!(report.to_string().ends_with("mean wait: 3.00 epochs"));
    }
}
