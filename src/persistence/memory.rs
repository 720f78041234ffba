//! In-memory Rule Repository

use jiff::Timestamp;
use rustc_hash::FxHashMap;

use crate::{
    ids::{RuleId, RuleKind},
    persistence::{RepositoryError, RuleRecord, RuleRepository},
};

type Records = FxHashMap<(RuleKind, RuleId), RuleRecord>;

/// Repository backed by a hash map, with one snapshot per open transaction.
#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    sequences: FxHashMap<RuleKind, u64>,
    records: Records,
    savepoints: Vec<Records>,
}

impl InMemoryRuleRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of `kind` that have not been removed, in id order.
    pub fn live(&self, kind: RuleKind) -> Vec<&RuleRecord> {
        let mut live: Vec<&RuleRecord> = self
            .records
            .values()
            .filter(|record| record.kind() == kind && !record.is_deleted())
            .collect();

        live.sort_by_key(|record| record.id);
        live
    }

    /// Number of open transactions.
    pub fn depth(&self) -> usize {
        self.savepoints.len()
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn next_id(&mut self, kind: RuleKind) -> Result<RuleId, RepositoryError> {
        let sequence = self.sequences.entry(kind).or_insert(0);
        *sequence += 1;

        Ok(RuleId::new(*sequence))
    }

    fn get_by_ids(
        &self,
        kind: RuleKind,
        ids: &[RuleId],
    ) -> Result<FxHashMap<RuleId, RuleRecord>, RepositoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.records
                    .get(&(kind, *id))
                    .map(|record| (*id, record.clone()))
            })
            .collect())
    }

    fn save(&mut self, record: RuleRecord) -> Result<(), RepositoryError> {
        self.records.insert((record.kind(), record.id), record);

        Ok(())
    }

    fn delete(&mut self, kind: RuleKind, id: RuleId) -> Result<(), RepositoryError> {
        let record = self
            .records
            .get_mut(&(kind, id))
            .ok_or(RepositoryError::NotFound { kind, id })?;

        if record.deleted_at.is_none() {
            record.deleted_at = Some(Timestamp::now());
        }

        Ok(())
    }

    fn begin_nested(&mut self) -> Result<(), RepositoryError> {
        self.savepoints.push(self.records.clone());

        Ok(())
    }

    fn commit(&mut self) -> Result<(), RepositoryError> {
        self.savepoints
            .pop()
            .map(drop)
            .ok_or(RepositoryError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.records = self.savepoints.pop().ok_or(RepositoryError::NoTransaction)?;

        Ok(())
    }

    fn flush(&mut self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::{
        persistence::StoredRule,
        policies::{PolicyNode, leaves::PolicyLeaf},
    };

    fn record(id: RuleId) -> TestResult<RuleRecord> {
        let leaf = PolicyLeaf::basket_quantity(Some(1), None)?;

        Ok(RuleRecord::new(
            id,
            leaf.describe(),
            StoredRule::Policy(PolicyNode::Leaf(leaf)),
        ))
    }

    #[test]
    fn ids_are_sequential_per_kind() -> TestResult {
        let mut repo = InMemoryRuleRepository::new();

        assert_eq!(repo.next_id(RuleKind::Discount)?, RuleId::new(1));
        assert_eq!(repo.next_id(RuleKind::Discount)?, RuleId::new(2));
        assert_eq!(repo.next_id(RuleKind::Policy)?, RuleId::new(1));

        Ok(())
    }

    #[test]
    fn delete_keeps_record_for_audit() -> TestResult {
        let mut repo = InMemoryRuleRepository::new();
        let id = repo.next_id(RuleKind::Policy)?;

        repo.save(record(id)?)?;
        repo.delete(RuleKind::Policy, id)?;

        let found = repo.get_by_ids(RuleKind::Policy, &[id, RuleId::new(99)])?;

        assert_eq!(found.len(), 1);
        assert!(found.get(&id).is_some_and(RuleRecord::is_deleted));
        assert!(repo.live(RuleKind::Policy).is_empty());

        Ok(())
    }

    #[test]
    fn rollback_restores_records_but_not_ids() -> TestResult {
        let mut repo = InMemoryRuleRepository::new();

        repo.begin_nested()?;
        let id = repo.next_id(RuleKind::Policy)?;
        repo.save(record(id)?)?;
        repo.rollback()?;

        assert!(repo.get_by_ids(RuleKind::Policy, &[id])?.is_empty());
        assert_eq!(repo.next_id(RuleKind::Policy)?, RuleId::new(2));
        assert_eq!(repo.depth(), 0);

        Ok(())
    }

    #[test]
    fn commit_without_transaction_fails() {
        let mut repo = InMemoryRuleRepository::new();

        assert_eq!(repo.commit(), Err(RepositoryError::NoTransaction));
        assert_eq!(repo.rollback(), Err(RepositoryError::NoTransaction));
    }

    #[test]
    fn delete_unknown_fails() {
        let mut repo = InMemoryRuleRepository::new();

        assert_eq!(
            repo.delete(RuleKind::Discount, RuleId::new(5)),
            Err(RepositoryError::NotFound {
                kind: RuleKind::Discount,
                id: RuleId::new(5)
            })
        );
    }
}
