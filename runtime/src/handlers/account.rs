use employer_incentives_core::services::DomainRepository;
use employer_incentives_core::{Account, LegalEntity};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::AddLegalEntityCommand;
use crate::handler::{CommandHandler, HandlerFuture};

/// Registers a legal entity, creating the account on first use.
///
/// Re-adding an entity the account already has is a no-op, so the command can
/// be redelivered safely.
pub struct AddLegalEntityHandler<R> {
    repository: Arc<R>,
}

impl<R> AddLegalEntityHandler<R> {
    /// Creates the handler.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: DomainRepository<Account>> CommandHandler<AddLegalEntityCommand>
    for AddLegalEntityHandler<R>
{
    fn handle<'a>(
        &'a self,
        command: &'a AddLegalEntityCommand,
        _cancel: &'a CancellationToken,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            let mut account = match self.repository.find(command.account_id).await? {
                Some(account) => {
                    if account.legal_entity(command.account_legal_entity_id).is_some() {
                        tracing::debug!(
                            account_id = command.account_id,
                            account_legal_entity_id = command.account_legal_entity_id,
                            "Legal entity already registered"
                        );
                        return Ok(());
                    }
                    account
                }
                None => Account::new(command.account_id),
            };

            account.add_legal_entity(LegalEntity {
                account_legal_entity_id: command.account_legal_entity_id,
                legal_entity_id: command.legal_entity_id,
                name: command.name.clone(),
            })?;

            self.repository.save(&mut account).await?;
            Ok(())
        })
    }
}
