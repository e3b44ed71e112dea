//! Single-consumer event loop tying a controller to a substrate.
//!
//! The runner spawns the population, starts the timer, then repeatedly takes
//! one event from the substrate, hands it to the controller, and forwards the
//! controller's outbound notices in emission order. Nothing else touches
//! controller state, so handlers are serialised by construction.
//!
//! The run ends when the last task terminates (success), when the epoch cap
//! is exceeded, when an invariant check fails, or when the substrate closes.
//! Every exit path shuts the substrate down, which joins every task.

use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::scheduler::controller::Controller;
use crate::scheduler::event::{Directive, Event};
use crate::scheduler::pcb::TaskId;
use crate::scheduler::report::Report;
use crate::substrate::{DeterministicSubstrate, EventSubstrate, TaskHandle, ThreadedSubstrate};
use crate::task::TaskEntity;

pub struct Runner<S: EventSubstrate> {
    cfg: SimConfig,
    substrate: S,
    controller: Option<Controller>,
}

impl<S: EventSubstrate> Runner<S> {
    pub fn new(cfg: SimConfig, substrate: S) -> Self {
        Self {
            cfg,
            substrate,
            controller: None,
        }
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// Controller of the last run, kept for inspection (trace, PCBs).
    pub fn controller(&self) -> Option<&Controller> {
        self.controller.as_ref()
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<Report, SimError> {
        self.run_observed(|_, _| {})
    }

    /// Run to completion, calling `observe` after every handled event with
    /// the controller state that event produced.
    pub fn run_observed<F>(&mut self, mut observe: F) -> Result<Report, SimError>
    where
        F: FnMut(&Controller, &Event),
    {
        self.cfg.validate()?;

        let handles = match self.spawn_all() {
            Ok(handles) => handles,
            Err(err) => {
                self.substrate.shutdown();
                return Err(err);
            }
        };
        info!(
            tasks = self.cfg.tasks,
            base_quantum = self.cfg.base_quantum,
            "simulation starting"
        );

        let mut ctl = Controller::new(&handles, self.cfg.base_quantum, self.cfg.trace_capacity);
        let result = match self.substrate.schedule_periodic(self.cfg.tick_interval) {
            Ok(()) => self.event_loop(&mut ctl, &mut observe),
            Err(err) => Err(SimError::Timer(err)),
        };

        self.substrate.shutdown();
        let reaped = self.substrate.reap_terminated();
        debug!(reaped = reaped.len(), "substrate shut down");
        self.controller = Some(ctl);
        result
    }

    fn spawn_all(&mut self) -> Result<Vec<TaskHandle>, SimError> {
        let mut handles = Vec::with_capacity(self.cfg.tasks);
        for idx in 0..self.cfg.tasks {
            let id = TaskId::from_u32(idx as u32);
            let entity = TaskEntity::new(id, self.cfg.workload.entropy_for(id));
            let handle = self.substrate.spawn(entity)?;
            trace!(task = %id, %handle, "spawned");
            handles.push(handle);
        }
        Ok(handles)
    }

    fn event_loop<F>(&mut self, ctl: &mut Controller, observe: &mut F) -> Result<Report, SimError>
    where
        F: FnMut(&Controller, &Event),
    {
        let mut out: Vec<Directive> = Vec::new();
        loop {
            let Some(event) = self.substrate.await_next_event() else {
                return Err(SimError::SubstrateClosed {
                    epoch: ctl.epoch(),
                });
            };
            if event == Event::Tick && ctl.epoch() >= self.cfg.max_epochs {
                return Err(SimError::EpochLimit {
                    limit: self.cfg.max_epochs,
                });
            }

            ctl.handle(event, &mut out);
            for directive in out.drain(..) {
                self.substrate.notify(directive.target, directive.notice);
            }

            if self.cfg.check_invariants {
                ctl.check_invariants()
                    .map_err(|violation| SimError::Invariant {
                        epoch: ctl.epoch(),
                        violation,
                    })?;
            }
            observe(ctl, &event);

            for handle in self.substrate.reap_terminated() {
                trace!(%handle, "task reaped");
            }

            if let Some(report) = ctl.report() {
                return Ok(report.clone());
            }
        }
    }
}

/// Run `cfg` on the deterministic substrate.
pub fn run_deterministic(cfg: SimConfig) -> Result<Report, SimError> {
    Runner::new(cfg, DeterministicSubstrate::new()).run()
}

/// Run `cfg` with one OS thread per task.
pub fn run_threaded(cfg: SimConfig) -> Result<Report, SimError> {
    Runner::new(cfg, ThreadedSubstrate::new()).run()
}
