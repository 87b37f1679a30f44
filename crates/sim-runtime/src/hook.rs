use sim_econ::Milestone;
use tracing::debug;

/// Side-effecting receiver of milestones crossed during a tick.
pub trait NotificationHook: Send {
    fn on_milestones(&mut self, milestones: &[Milestone]);
}

impl<F> NotificationHook for F
where
    F: FnMut(&[Milestone]) + Send,
{
    fn on_milestones(&mut self, milestones: &[Milestone]) {
        self(milestones)
    }
}

/// Default hook: records milestones in the trace log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogHook;

impl NotificationHook for LogHook {
    fn on_milestones(&mut self, milestones: &[Milestone]) {
        for m in milestones {
            debug!(resource = m.kind.as_str(), reached = m.reached, "milestone");
        }
    }
}
