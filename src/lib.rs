//! Depot library exports for testing

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod api;
pub mod controller;
pub mod core;

#[cfg(test)]
pub mod test_support;

/// Which assistant persona the chatbot backend should answer as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[default]
    Clerk,
    Picker,
    Packer,
    Manager,
    Driver,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Clerk,
        AgentRole::Picker,
        AgentRole::Packer,
        AgentRole::Manager,
        AgentRole::Driver,
    ];

    /// Wire name, as sent in the `role` field of chat requests.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Clerk => "clerk",
            AgentRole::Picker => "picker",
            AgentRole::Packer => "packer",
            AgentRole::Manager => "manager",
            AgentRole::Driver => "driver",
        }
    }

    /// Returns a human-readable label for display
    pub fn label(self) -> &'static str {
        match self {
            AgentRole::Clerk => "Inventory Clerk",
            AgentRole::Picker => "Picker",
            AgentRole::Packer => "Packer",
            AgentRole::Manager => "Warehouse Manager",
            AgentRole::Driver => "Driver",
        }
    }

    /// Parses a wire name, case-insensitively. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<AgentRole> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
    }
}
