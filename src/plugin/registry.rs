//! Plugin lookup by chain position.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::RouteDescriptor;

use super::PluginClass;

/// One configured step of a plugin chain.
#[derive(Clone)]
pub struct PluginStep {
    pub class: Arc<dyn PluginClass>,
    pub options: Value,
}

/// The build's plugin chains, keyed by chain type.
///
/// Master and workers build identical chains, so a [`RouteDescriptor`] names
/// the same step in every process.
#[derive(Default, Clone)]
pub struct PluginChain {
    chains: HashMap<String, Vec<PluginStep>>,
}

impl PluginChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to chain `kind` and return its route.
    pub fn push(
        &mut self,
        kind: &str,
        class: Arc<dyn PluginClass>,
        options: Value,
    ) -> RouteDescriptor {
        let steps = self.chains.entry(kind.to_string()).or_default();
        steps.push(PluginStep { class, options });
        RouteDescriptor {
            kind: kind.to_string(),
            plugin_index: steps.len() - 1,
        }
    }

    /// The step a route points at.
    pub fn step(&self, route: &RouteDescriptor) -> Option<&PluginStep> {
        self.chains.get(&route.kind)?.get(route.plugin_index)
    }

    /// Number of steps in chain `kind`.
    pub fn len(&self, kind: &str) -> usize {
        self.chains.get(kind).map_or(0, Vec::len)
    }
}
