use crate::actions::ActionBinder;
use crate::error::Result;
use crate::host::{ControllerOptions, Host};
use crate::targets::{TargetResolver, TargetSpec};

/// The standard controller set for a component: light-DOM actions,
/// shadow-root actions and shadow-root targets.
pub struct CrystallizedController {
    pub host: Host,
    pub actions: ActionBinder,
    pub shadow_actions: ActionBinder,
    pub targets: TargetResolver,
}

impl CrystallizedController {
    pub fn new<I, N>(host: &Host, targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, TargetSpec)>,
        N: Into<String>,
    {
        Ok(Self {
            host: host.clone(),
            actions: ActionBinder::new(host, ControllerOptions::light()),
            shadow_actions: ActionBinder::new(host, ControllerOptions::shadow()),
            targets: TargetResolver::new(host, targets, ControllerOptions::shadow())?,
        })
    }
}
