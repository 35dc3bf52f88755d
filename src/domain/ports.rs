//! Domain Ports - Collaborator contracts for the inventory engine
//!
//! These traits define the boundaries between discovery/assembly logic and
//! the systems it talks to: the management API, a command gateway for
//! diagnostic tools, and the sink that receives the assembled graph.

use super::inventory::{ManagedObject, ObjectKind, ObjectRef};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Command Execution
// =============================================================================

/// Output of one command run through a gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Successful output with exit code 0
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Port for running diagnostic commands on a local or remote host.
///
/// Every call is bounded by the gateway's fixed timeout and never retried.
/// A command that runs but exits non-zero is still `Ok`: tools like
/// smartctl report warnings through the exit code while printing usable
/// output.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    /// Run a shell command line
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Run a shell command line with elevated privileges
    async fn exec_privileged(&self, command: &str) -> Result<CommandOutput>;

    /// Whether the gateway may run `tool` with root privileges
    async fn check_root_permission(&self, tool: &str) -> Result<bool>;

    /// Host the commands run on, for logging
    fn target(&self) -> &str;
}

// =============================================================================
// Management API
// =============================================================================

/// Port for the read-only virtualization management API.
///
/// A session must be connected before retrieval and disconnected after.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Open the session
    async fn connect(&self) -> Result<()>;

    /// Close the session
    async fn disconnect(&self) -> Result<()>;

    /// Root folder of the inventory
    fn root_folder(&self) -> ObjectRef;

    /// Retrieve every object of `kind` under `container`
    async fn retrieve(
        &self,
        container: &ObjectRef,
        kind: ObjectKind,
        recursive: bool,
    ) -> Result<Vec<ManagedObject>>;

    /// Retrieve the referenced objects, in order
    async fn retrieve_objects(&self, refs: &[ObjectRef]) -> Result<Vec<ManagedObject>>;

    /// Endpoint the session talks to, e.g. the server URL
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Emission Types
// =============================================================================

/// A graph node handed to the emitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub label: String,
    pub domain_id: String,
    pub name: String,
    /// Management endpoint, only set on the root node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// A directed relation between two graph nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRelation {
    pub from: GraphNode,
    pub to: GraphNode,
    pub relationship: String,
}

/// Field value of a flat measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A flat measurement: name, tag set and field set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Port for the collaborator that turns entities into stored data
pub trait TopologySink: Send {
    /// Accept one graph node
    fn node(&mut self, node: &GraphNode) -> Result<()>;

    /// Accept one relation
    fn relation(&mut self, relation: &GraphRelation) -> Result<()>;

    /// Accept one flat measurement
    fn measurement(&mut self, measurement: &Measurement) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type CommandGatewayRef = Arc<dyn CommandGateway>;
pub type ManagementApiRef = Arc<dyn ManagementApi>;
