//! Store errors.

use thiserror::Error;

use crate::{
    ids::{RuleId, RuleKind},
    persistence::RepositoryError,
    tree::TreeError,
    validation::ValidationError,
};

/// Errors returned by store rule administration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Rule parameters were rejected before touching the tree.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The id is not part of the store's tree.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Rule family.
        kind: RuleKind,
        /// Missing id.
        id: RuleId,
    },

    /// The root rule cannot be removed, edited or combined.
    #[error("{kind} {id} is the store root")]
    RootRule {
        /// Rule family.
        kind: RuleKind,
        /// Root id.
        id: RuleId,
    },

    /// The tree rejected a structural edit.
    #[error("{kind} tree edit failed: {source}")]
    Tree {
        /// Rule family.
        kind: RuleKind,
        /// Underlying error.
        #[source]
        source: TreeError,
    },

    /// A structural edit failed in the repository and was rolled back.
    #[error("{operation} was rolled back: {source}")]
    Transaction {
        /// Operation name.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: RepositoryError,
    },

    /// Repository error outside a transaction.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StoreError {
    pub(crate) fn from_tree(kind: RuleKind, error: TreeError) -> Self {
        match error {
            TreeError::NotFound(id) => StoreError::NotFound { kind, id },
            TreeError::Root(id) => StoreError::RootRule { kind, id },
            TreeError::NotComposite(_) | TreeError::DuplicateId(_) => {
                StoreError::Tree { kind, source: error }
            }
        }
    }

    pub(crate) fn in_transaction(self, operation: &'static str) -> Self {
        match self {
            StoreError::Repository(source) => StoreError::Transaction { operation, source },
            other => other,
        }
    }
}
