//! Deals: role-scoped CRUD and the stage pipeline board.

use chrono::Utc;
use rust_decimal::Decimal;

use nexa_shared::types::{DealId, DealStage};
use nexa_shared::CrmError;
use nexa_store::{Deal, DealPatch, NewDeal, Storage};

use crate::collection::ScopedStore;
use crate::events::Notifier;
use crate::session::SessionStore;

/// Visible deals grouped by pipeline stage, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealBoard {
    pub lead: Vec<Deal>,
    pub proposal: Vec<Deal>,
    pub closed: Vec<Deal>,
}

impl DealBoard {
    pub fn column(&self, stage: DealStage) -> &[Deal] {
        match stage {
            DealStage::Lead => &self.lead,
            DealStage::Proposal => &self.proposal,
            DealStage::Closed => &self.closed,
        }
    }

    /// Summed value of one column.
    pub fn total(&self, stage: DealStage) -> Decimal {
        self.column(stage).iter().map(|d| d.value).sum()
    }
}

#[derive(Clone)]
pub struct DealStore {
    deals: ScopedStore<Deal>,
    notifier: Notifier,
}

impl DealStore {
    pub fn new(storage: Storage, session: SessionStore, notifier: Notifier) -> Self {
        Self {
            deals: ScopedStore::new(storage, session),
            notifier,
        }
    }

    pub fn refresh(&self) {
        self.deals.refresh();
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.deals.visible()
    }

    pub fn board(&self) -> DealBoard {
        let mut board = DealBoard::default();
        for deal in self.deals.visible() {
            match deal.stage {
                DealStage::Lead => board.lead.push(deal),
                DealStage::Proposal => board.proposal.push(deal),
                DealStage::Closed => board.closed.push(deal),
            }
        }
        board
    }

    pub fn create_deal(&self, draft: NewDeal) -> Result<Deal, CrmError> {
        if let Err(e) = draft.validate() {
            self.notifier.error(e.to_string());
            return Err(e);
        }
        let deal = draft.into_deal(Utc::now());
        self.deals.insert(deal.clone());

        tracing::info!(deal_id = %deal.id, value = %deal.value, "Deal created");
        self.notifier.success("Negociação criada com sucesso");
        Ok(deal)
    }

    /// Merge `patch` and refresh `updatedAt`. Unknown ids are a silent no-op
    /// returning `Ok(None)`.
    pub fn update_deal(&self, id: &DealId, patch: DealPatch) -> Result<Option<Deal>, CrmError> {
        if let Err(e) = patch.validate() {
            self.notifier.error(e.to_string());
            return Err(e);
        }
        let now = Utc::now();
        let updated = self.deals.update(id, |d| patch.apply(d, now));
        if updated.is_some() {
            tracing::info!(deal_id = %id, "Deal updated");
            self.notifier.success("Negociação atualizada com sucesso");
        }
        Ok(updated)
    }

    pub fn delete_deal(&self, id: &DealId) -> bool {
        let removed = self.deals.remove(id);
        if removed {
            tracing::info!(deal_id = %id, "Deal deleted");
            self.notifier.success("Negociação excluída com sucesso");
        }
        removed
    }

    /// Stages are freely settable in any direction.
    pub fn set_stage(&self, id: &DealId, stage: DealStage) -> Option<Deal> {
        let now = Utc::now();
        let updated = self.deals.update(id, |d| DealPatch::stage(stage).apply(d, now))?;
        tracing::debug!(deal_id = %id, ?stage, "Deal stage changed");
        self.notifier.success("Estágio da negociação atualizado");
        Some(updated)
    }
}
