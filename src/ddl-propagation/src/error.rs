// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::exec::ExecutionError;
use crate::names::ObjectType;

/// Errors that abort the propagation of a DDL statement.
///
/// None of these are retried. The caller is expected to abort the enclosing
/// transaction, which releases its table locks and discards the local
/// effects of the statement.
#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    /// A named object does not exist.
    #[error("{kind} \"{name}\" does not exist")]
    ObjectNotFound { kind: ObjectType, name: String },
    /// A dependency of the object could not be created on the worker nodes.
    #[error("could not create {object} on worker nodes")]
    DependencyUnsatisfiable {
        object: String,
        #[source]
        source: ExecutionError,
    },
    /// A worker node failed to apply a propagated command.
    #[error(transparent)]
    RemoteExecution(#[from] ExecutionError),
    /// Propagation was requested from a node that may not originate it.
    #[error("operation is not allowed on this node")]
    NotCoordinator,
    /// An unqualified name was created while no schema on the search path
    /// exists.
    #[error("no schema has been selected to create in")]
    NoCreationSchema,
    /// The named object kept changing while the statement waited for its
    /// table lock.
    #[error("{kind} \"{name}\" was concurrently modified")]
    ConcurrentDdl { kind: ObjectType, name: String },
    /// The named feature is not supported by the host database.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl PropagationError {
    /// Reports additional details about the error, if any are available.
    pub fn detail(&self) -> Option<String> {
        match self {
            PropagationError::DependencyUnsatisfiable { source, .. } => Some(source.to_string()),
            PropagationError::RemoteExecution(e) => e
                .node
                .map(|node| format!("The command failed on worker node {}.", node)),
            PropagationError::ConcurrentDdl { .. } => Some(
                "The object was renamed, moved or replaced by another session \
                 each time its table lock was acquired."
                    .into(),
            ),
            _ => None,
        }
    }

    /// Reports a hint for the user about how the error could be fixed.
    pub fn hint(&self) -> Option<String> {
        match self {
            PropagationError::NotCoordinator => {
                Some("Connect to the coordinator and run it again.".into())
            }
            PropagationError::NoCreationSchema => {
                Some("Qualify the name with a schema or set search_path.".into())
            }
            PropagationError::ConcurrentDdl { .. } => Some("Retry the statement.".into()),
            PropagationError::Unsupported(_) => {
                Some("Upgrade the database on every node to a version that supports it.".into())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::names::NodeId;

    use super::*;

    #[test]
    fn remote_errors_are_verbatim() {
        let err = PropagationError::from(ExecutionError::on_node(
            NodeId(2),
            "permission denied for schema s1",
        ));
        assert_eq!(err.to_string(), "permission denied for schema s1");
        assert_eq!(
            err.detail().as_deref(),
            Some("The command failed on worker node 2.")
        );
    }

    #[test]
    fn dependency_errors_chain_their_source() {
        let err = PropagationError::DependencyUnsatisfiable {
            object: "schema s1".into(),
            source: ExecutionError::on_node(NodeId(1), "connection refused"),
        };
        assert_eq!(err.to_string(), "could not create schema s1 on worker nodes");
        assert_eq!(
            err.source().map(|e| e.to_string()).as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn not_found_names_the_object() {
        let err = PropagationError::ObjectNotFound {
            kind: ObjectType::Statistics,
            name: "s1.st".into(),
        };
        assert_eq!(err.to_string(), "statistics object \"s1.st\" does not exist");
        assert_eq!(err.hint(), None);
    }
}
