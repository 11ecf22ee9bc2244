use serde::{Deserialize, Serialize};

/// A project owns workflows and the VCS host configurations its applications
/// link to. Loading a project includes resolving its variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub key: String,
    pub name: String,
    pub variables: Vec<Variable>,
    pub vcs_servers: Vec<VcsServerLink>,
}

impl Project {
    pub fn vcs_server(&self, name: &str) -> Option<&VcsServerLink> {
        self.vcs_servers.iter().find(|server| server.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// A VCS host configuration linked to a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsServerLink {
    pub name: String,
}

/// A registered worker. Identity claims on inbound requests resolve to this
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
}
