//! The motion worker: one perpetual task that drains the latest-wins
//! command slot at a fixed tick.
//!
//! Per tick:
//!
//! 1. While the stop gate is engaged: relax, clear the slot, skip. The
//!    flag itself is cleared only by a new motion request.
//! 2. Otherwise read the slot; empty means an idle tick.
//! 3. Map the command to exactly one actuator call and execute it once.
//!    Height and pose commands recompute `body_z` with clamping under the
//!    lock before the pose call is issued outside it.
//! 4. Clear the slot only if it still holds the executed instance; a
//!    newer command written mid-execution survives to the next tick.
//!
//! Actuator faults are logged and treated as a skipped tick; the worker
//! never terminates on a hardware error. The loop exits only when
//! `running` goes false.

use std::sync::Arc;

use hexctl_types::MotionCommand;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::gate::GatedActuator;
use crate::state::{ControlContext, QueuedCommand};

/// What one tick decided to do, computed under the lock and acted on
/// outside it.
enum Tick {
    Shutdown,
    Stopped,
    Idle,
    Execute { queued: QueuedCommand, z: i32 },
}

/// Spawn the worker onto the current runtime.
pub fn spawn(ctx: Arc<ControlContext>, actuator: Arc<GatedActuator>) -> JoinHandle<()> {
    tokio::spawn(run(ctx, actuator))
}

/// The worker loop. Runs until shutdown.
pub async fn run(ctx: Arc<ControlContext>, actuator: Arc<GatedActuator>) {
    let mut tick = tokio::time::interval(ctx.tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_ms = ctx.tick.as_millis() as u64, "motion worker started");

    loop {
        tick.tick().await;

        let decision = {
            let mut st = ctx.lock();
            if !st.running {
                Tick::Shutdown
            } else if st.stop_all {
                st.current_cmd = None;
                Tick::Stopped
            } else if let Some(queued) = st.current_cmd {
                let z = match queued.cmd {
                    MotionCommand::Raise => {
                        st.body_z = ctx.heights.clamp(st.body_z + 2);
                        st.body_z
                    }
                    MotionCommand::Lower => {
                        st.body_z = ctx.heights.clamp(st.body_z - 2);
                        st.body_z
                    }
                    MotionCommand::TabletopPose => {
                        st.body_z = ctx.heights.clamp(ctx.heights.tabletop_z);
                        st.body_z
                    }
                    MotionCommand::ResetPose => {
                        st.body_z = ctx.heights.clamp(ctx.heights.reset_z);
                        st.body_z
                    }
                    _ => st.body_z,
                };
                Tick::Execute { queued, z }
            } else {
                Tick::Idle
            }
        };

        match decision {
            Tick::Shutdown => break,
            Tick::Idle => {}
            Tick::Stopped => {
                if let Err(e) = actuator.relax() {
                    warn!(error = %e, "relax failed while stopped");
                }
            }
            Tick::Execute { queued, z } => {
                let result = match queued.cmd.gait_step() {
                    Some(step) => actuator.execute_gait_step(&step),
                    None => actuator.move_to_pose(0, 0, z),
                };
                if let Err(e) = result {
                    warn!(command = %queued.cmd, error = %e, "actuator call failed; tick skipped");
                }
                ctx.lock().clear_if_current(queued);
            }
        }
    }

    info!("motion worker stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hexctl_hal::HardwareCall;
    use hexctl_hal::sim::{CallJournal, FlakyMotion, SimMotion};
    use hexctl_types::GaitStep;

    use super::*;
    use crate::state::ControlConfig;

    fn harness_with(
        motion: Box<dyn hexctl_hal::MotionActuator>,
    ) -> (Arc<ControlContext>, Arc<GatedActuator>) {
        let ctx = Arc::new(ControlContext::new(ControlConfig::default()));
        let gate = Arc::new(GatedActuator::new(ctx.clone(), motion));
        (ctx, gate)
    }

    fn harness() -> (Arc<ControlContext>, Arc<GatedActuator>, CallJournal) {
        let journal = CallJournal::new();
        let (ctx, gate) = harness_with(SimMotion::new(&journal));
        (ctx, gate, journal)
    }

    async fn settle(ticks: u64) {
        tokio::time::sleep(Duration::from_millis(10 * ticks + 5)).await;
    }

    fn gait_of(cmd: MotionCommand) -> GaitStep {
        cmd.gait_step().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn latest_command_wins() {
        let (ctx, gate, journal) = harness();
        {
            let mut st = ctx.lock();
            st.queue(MotionCommand::Forward);
            st.queue(MotionCommand::StrafeLeft);
        }
        let worker = spawn(ctx.clone(), gate);
        settle(2).await;

        let calls = journal.calls();
        assert_eq!(
            calls,
            vec![HardwareCall::GaitStep(gait_of(MotionCommand::StrafeLeft))]
        );
        assert!(ctx.lock().current_cmd.is_none());
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_relaxes_and_clears_slot() {
        let (ctx, gate, journal) = harness();
        {
            let mut st = ctx.lock();
            st.queue(MotionCommand::Forward);
            st.stop_all = true;
        }
        let worker = spawn(ctx.clone(), gate);
        settle(3).await;

        assert_eq!(journal.count(|c| matches!(c, HardwareCall::GaitStep(_))), 0);
        assert!(journal.count(|c| matches!(c, HardwareCall::Relax)) >= 1);
        assert!(ctx.lock().current_cmd.is_none());
        // The worker never clears the flag on its own.
        assert!(ctx.lock().stop_all);
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn new_command_after_stop_executes() {
        let (ctx, gate, journal) = harness();
        ctx.lock().stop_all = true;
        let worker = spawn(ctx.clone(), gate);
        settle(2).await;
        journal.take();

        // A new motion request clears the flag (done by the request layer)
        // and the next tick executes it.
        {
            let mut st = ctx.lock();
            st.stop_all = false;
            st.queue(MotionCommand::Forward);
        }
        settle(2).await;

        assert_eq!(
            journal.count(|c| matches!(c, HardwareCall::GaitStep(s) if *s == gait_of(MotionCommand::Forward))),
            1
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn raise_recomputes_height_with_clamp() {
        let (ctx, gate, journal) = harness();
        ctx.lock().body_z = 44;
        ctx.lock().queue(MotionCommand::Raise);
        let worker = spawn(ctx.clone(), gate);
        settle(2).await;

        // 44 + 2 clamps at MAX_Z = 45.
        assert_eq!(ctx.lock().body_z, 45);
        assert_eq!(
            journal.calls(),
            vec![HardwareCall::MoveToPose { x: 0, y: 0, z: 45 }]
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn tabletop_pose_moves_to_named_height() {
        let (ctx, gate, journal) = harness();
        ctx.lock().queue(MotionCommand::TabletopPose);
        let worker = spawn(ctx.clone(), gate);
        settle(2).await;

        assert_eq!(ctx.lock().body_z, 40);
        assert_eq!(
            journal.calls(),
            vec![HardwareCall::MoveToPose { x: 0, y: 0, z: 40 }]
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn actuator_fault_skips_tick_and_worker_survives() {
        let journal = CallJournal::new();
        let (ctx, gate) = harness_with(FlakyMotion::new(&journal, 1));
        ctx.lock().queue(MotionCommand::Forward);
        let worker = spawn(ctx.clone(), gate);
        settle(2).await;

        // First call failed and was skipped; slot was still cleared.
        assert!(journal.calls().is_empty());
        assert!(ctx.lock().current_cmd.is_none());

        ctx.lock().queue(MotionCommand::TurnLeft);
        settle(2).await;
        assert_eq!(
            journal.calls(),
            vec![HardwareCall::GaitStep(gait_of(MotionCommand::TurnLeft))]
        );
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn worker_exits_when_running_clears() {
        let (ctx, gate, _journal) = harness();
        let worker = spawn(ctx.clone(), gate);
        settle(1).await;

        ctx.lock().running = false;
        settle(2).await;
        assert!(worker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_executes_at_most_one_action() {
        let (ctx, gate, journal) = harness();
        ctx.lock().queue(MotionCommand::Forward);
        let worker = spawn(ctx.clone(), gate);
        settle(10).await;

        // One queued command, one execution; the slot does not replay.
        assert_eq!(journal.calls().len(), 1);
        worker.abort();
    }
}
