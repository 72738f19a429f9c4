//! Employer account aggregate.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::event::DomainEvent;
use crate::services::Aggregate;

/// A legal entity registered against an employer account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalEntity {
    /// Account-scoped id the incentive payments reference
    pub account_legal_entity_id: i64,
    /// Legal entity id
    pub legal_entity_id: i64,
    /// Registered name
    pub name: String,
}

/// An employer account and its legal entities.
#[derive(Clone, Debug)]
pub struct Account {
    id: i64,
    legal_entities: Vec<LegalEntity>,
    is_new: bool,
    events: Vec<DomainEvent>,
}

impl Account {
    /// Creates an account with no legal entities.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            legal_entities: Vec::new(),
            is_new: true,
            events: Vec::new(),
        }
    }

    /// Rebuilds a persisted account.
    #[must_use]
    pub const fn from_parts(id: i64, legal_entities: Vec<LegalEntity>) -> Self {
        Self {
            id,
            legal_entities,
            is_new: false,
            events: Vec::new(),
        }
    }

    /// Registered legal entities.
    #[must_use]
    pub fn legal_entities(&self) -> &[LegalEntity] {
        &self.legal_entities
    }

    /// Looks up a legal entity by its account-scoped id.
    #[must_use]
    pub fn legal_entity(&self, account_legal_entity_id: i64) -> Option<&LegalEntity> {
        self.legal_entities
            .iter()
            .find(|e| e.account_legal_entity_id == account_legal_entity_id)
    }

    /// Registers a legal entity.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::RuleViolation`] if the account already has an
    /// entity with the same `account_legal_entity_id`.
    pub fn add_legal_entity(&mut self, legal_entity: LegalEntity) -> Result<()> {
        if self
            .legal_entity(legal_entity.account_legal_entity_id)
            .is_some()
        {
            return Err(DomainError::RuleViolation(format!(
                "legal entity {} is already registered on account {}",
                legal_entity.account_legal_entity_id, self.id
            )));
        }

        self.events.push(DomainEvent::LegalEntityAdded {
            account_id: self.id,
            account_legal_entity_id: legal_entity.account_legal_entity_id,
            legal_entity_id: legal_entity.legal_entity_id,
            name: legal_entity.name.clone(),
        });
        self.legal_entities.push(legal_entity);
        Ok(())
    }

    /// Removes a legal entity. Absent entities are ignored.
    pub fn remove_legal_entity(&mut self, account_legal_entity_id: i64) {
        let before = self.legal_entities.len();
        self.legal_entities
            .retain(|e| e.account_legal_entity_id != account_legal_entity_id);

        if self.legal_entities.len() != before {
            self.events.push(DomainEvent::LegalEntityRemoved {
                account_id: self.id,
                account_legal_entity_id,
            });
        }
    }
}

impl Aggregate for Account {
    type Id = i64;

    const KIND: &'static str = "Account";

    fn id(&self) -> Self::Id {
        self.id
    }

    fn is_new(&self) -> bool {
        self.is_new
    }

    fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    fn flush_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entity(id: i64) -> LegalEntity {
        LegalEntity {
            account_legal_entity_id: id,
            legal_entity_id: id * 10,
            name: format!("Entity {id}"),
        }
    }

    #[test]
    fn duplicate_legal_entity_is_a_rule_violation() {
        let mut account = Account::new(1);
        account.add_legal_entity(entity(5)).unwrap();

        assert!(matches!(
            account.add_legal_entity(entity(5)),
            Err(DomainError::RuleViolation(_))
        ));
        assert_eq!(account.legal_entities().len(), 1);
        assert_eq!(account.flush_events().len(), 1);
    }

    #[test]
    fn removing_raises_an_event_only_when_something_was_removed() {
        let mut account = Account::from_parts(1, vec![entity(5)]);

        account.remove_legal_entity(6);
        assert!(account.flush_events().is_empty());

        account.remove_legal_entity(5);
        assert!(account.legal_entities().is_empty());
        assert_eq!(
            account.flush_events(),
            vec![DomainEvent::LegalEntityRemoved {
                account_id: 1,
                account_legal_entity_id: 5
            }]
        );
    }
}
