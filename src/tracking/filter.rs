use crate::config::PluginConfig;
use crate::host::InboundEvent;

/// Gate evaluated at every lifecycle point. Pure: event + config only.
pub fn should_track(event: &dyn InboundEvent, config: &PluginConfig) -> bool {
    if config.suppress_sending {
        return false;
    }
    !is_ignored(event.user_id(), config)
}

pub fn is_ignored(user_id: &str, config: &PluginConfig) -> bool {
    config.ignore_rules.iter().any(|rule| rule.matches(user_id))
}
