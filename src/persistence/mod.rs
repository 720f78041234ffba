//! Rule Persistence
//!
//! The engine never owns storage. Every structural edit receives a [`RuleRepository`] handle and
//! drives it through `begin_nested`, `commit` and `rollback`.

use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    discounts::DiscountNode,
    ids::{RuleId, RuleKind},
    policies::PolicyNode,
};

pub mod memory;

pub use memory::InMemoryRuleRepository;

/// Errors reported by a repository.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No record with this id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Rule family.
        kind: RuleKind,
        /// Missing id.
        id: RuleId,
    },

    /// `commit` or `rollback` without a matching `begin_nested`.
    #[error("no open transaction")]
    NoTransaction,

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A node as persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRule {
    /// Discount node.
    Discount(DiscountNode),

    /// Policy node.
    Policy(PolicyNode),
}

impl StoredRule {
    /// Rule family of the node.
    pub fn kind(&self) -> RuleKind {
        match self {
            StoredRule::Discount(_) => RuleKind::Discount,
            StoredRule::Policy(_) => RuleKind::Policy,
        }
    }
}

/// Persisted rule with its audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRecord {
    /// Rule id.
    pub id: RuleId,

    /// Description at the time of the last save.
    pub description: String,

    /// Node contents.
    pub rule: StoredRule,

    /// Set when the rule is removed; the record stays readable.
    pub deleted_at: Option<Timestamp>,
}

impl RuleRecord {
    /// Live record.
    pub fn new(id: RuleId, description: String, rule: StoredRule) -> Self {
        Self {
            id,
            description,
            rule,
            deleted_at: None,
        }
    }

    /// Rule family.
    pub fn kind(&self) -> RuleKind {
        self.rule.kind()
    }

    /// Whether the rule has been removed.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Key-value store of rule records with nested transactions.
#[automock]
pub trait RuleRepository {
    /// Allocate a fresh id. Ids are never handed out twice, even across rollbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] on backend failure.
    fn next_id(&mut self, kind: RuleKind) -> Result<RuleId, RepositoryError>;

    /// Fetch records, including removed ones; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] on backend failure.
    fn get_by_ids(
        &self,
        kind: RuleKind,
        ids: &[RuleId],
    ) -> Result<FxHashMap<RuleId, RuleRecord>, RepositoryError>;

    /// Insert or overwrite a record.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] on backend failure.
    fn save(&mut self, record: RuleRecord) -> Result<(), RepositoryError>;

    /// Mark a record as removed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] for unknown ids.
    fn delete(&mut self, kind: RuleKind, id: RuleId) -> Result<(), RepositoryError>;

    /// Open a (possibly nested) transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] on backend failure.
    fn begin_nested(&mut self) -> Result<(), RepositoryError>;

    /// Commit the innermost transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoTransaction`] without an open transaction.
    fn commit(&mut self) -> Result<(), RepositoryError>;

    /// Discard the innermost transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NoTransaction`] without an open transaction.
    fn rollback(&mut self) -> Result<(), RepositoryError>;

    /// Push pending writes to the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`RepositoryError`] on backend failure.
    fn flush(&mut self) -> Result<(), RepositoryError>;
}
