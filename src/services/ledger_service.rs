//! Business logic for the credit ledger. Every balance-affecting operation
//! is an atomic conditional update at the store layer followed by a
//! transaction append; when the append fails the balance change is
//! compensated so the pair is never half-applied.

use std::time::SystemTime;

use tracing::{error, info};
use uuid::Uuid;

use crate::{
    dao::models::{TransactionEntity, TransactionKind, VenueEntity},
    dto::ledger::{
        AccreditRequest, PurchaseStockRequest, TransactionFilterQuery, TransactionSummary,
    },
    error::ServiceError,
    services::change_events,
    state::SharedState,
};

/// Movement kinds surfaced on the patron-facing feed.
const MOVEMENT_KINDS: [TransactionKind; 2] = [
    TransactionKind::VenueAccreditation,
    TransactionKind::Consumption,
];

/// Platform operator grants stock to a venue. No upper bound beyond request
/// validation; each call is a new purchase, never deduplicated.
pub async fn purchase_stock(
    state: &SharedState,
    venue_id: Uuid,
    request: PurchaseStockRequest,
) -> Result<TransactionSummary, ServiceError> {
    if request.quantity == 0 {
        return Err(ServiceError::InvalidInput(
            "purchase quantity must be strictly positive".into(),
        ));
    }

    let store = state.require_ledger_store().await?;
    let applied = store.add_stock(venue_id, request.quantity).await?;
    if !applied {
        return Err(venue_not_found(venue_id));
    }

    let transaction = TransactionEntity {
        id: Uuid::new_v4(),
        venue_id,
        kind: TransactionKind::PlatformPurchase,
        quantity: request.quantity,
        unit_price: request.unit_price,
        total: u64::from(request.quantity) * u64::from(request.unit_price),
        description: Some(format!(
            "Purchased {} credits from the platform",
            request.quantity
        )),
        song_title: None,
        requested_by: None,
        created_at: SystemTime::now(),
    };

    if let Err(err) = store.insert_transaction(transaction.clone()).await {
        // Roll the stock increment back so the grant never exists without
        // its audit row.
        if let Err(rollback_err) = store.deduct_stock_floored(venue_id, request.quantity).await {
            error!(
                %venue_id,
                error = %rollback_err,
                "failed to roll back stock grant after transaction append failure"
            );
        }
        return Err(err.into());
    }

    info!(%venue_id, quantity = request.quantity, "platform stock purchased");
    change_events::refresh_venue(state, venue_id).await;
    change_events::broadcast_transaction_appended(state, transaction.clone());

    Ok(transaction.into())
}

/// Move credits from a venue's platform stock into its public screen pool.
/// The accreditation transaction is valued at the venue's sell price.
pub async fn accredit_to_screen(
    state: &SharedState,
    venue_id: Uuid,
    request: AccreditRequest,
) -> Result<TransactionSummary, ServiceError> {
    if request.quantity == 0 {
        return Err(ServiceError::InvalidInput(
            "accreditation quantity must be strictly positive".into(),
        ));
    }

    let store = state.require_ledger_store().await?;
    let venue = store
        .find_venue(venue_id)
        .await?
        .ok_or_else(|| venue_not_found(venue_id))?;

    let applied = store.accredit_credits(venue_id, request.quantity).await?;
    if !applied {
        // The guard did not hold; re-read to report the current stock.
        return Err(match store.find_venue(venue_id).await? {
            Some(current) => ServiceError::InsufficientStock {
                requested: request.quantity,
                available: current.platform_stock,
            },
            None => venue_not_found(venue_id),
        });
    }

    let transaction = accreditation_transaction(&venue, request.quantity);
    if let Err(err) = store.insert_transaction(transaction.clone()).await {
        if let Err(rollback_err) = store
            .revoke_accreditation(venue_id, request.quantity)
            .await
        {
            error!(
                %venue_id,
                error = %rollback_err,
                "failed to roll back accreditation after transaction append failure"
            );
        }
        return Err(err.into());
    }

    info!(%venue_id, quantity = request.quantity, "credits accredited to screen pool");
    change_events::refresh_venue(state, venue_id).await;
    change_events::broadcast_transaction_appended(state, transaction.clone());

    Ok(transaction.into())
}

/// Delete a transaction as a platform-admin correction. Reversing a platform
/// purchase also takes the granted stock back, floored at zero so an
/// out-of-order correction cannot drive the balance negative.
pub async fn reverse_transaction(
    state: &SharedState,
    transaction_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_ledger_store().await?;
    let transaction = store.find_transaction(transaction_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("transaction `{transaction_id}` not found"))
    })?;

    let deleted = store.delete_transaction(transaction_id).await?;
    if !deleted {
        return Err(ServiceError::NotFound(format!(
            "transaction `{transaction_id}` not found"
        )));
    }

    if transaction.kind == TransactionKind::PlatformPurchase {
        store
            .deduct_stock_floored(transaction.venue_id, transaction.quantity)
            .await?;
    }

    info!(
        %transaction_id,
        venue_id = %transaction.venue_id,
        kind = transaction.kind.as_str(),
        "transaction reversed"
    );
    change_events::refresh_venue(state, transaction.venue_id).await;

    Ok(())
}

/// Transactions, newest first, with optional venue/kind/time filters.
pub async fn list_transactions(
    state: &SharedState,
    query: TransactionFilterQuery,
) -> Result<Vec<TransactionSummary>, ServiceError> {
    let (venue_id, filter) = query.into_filter()?;
    let store = state.require_ledger_store().await?;
    let transactions = store.list_transactions(venue_id, filter).await?;
    Ok(transactions.into_iter().map(Into::into).collect())
}

/// Latest accreditations and consumptions for a venue's public feed.
pub async fn recent_movements(
    state: &SharedState,
    venue_id: Uuid,
    limit: usize,
) -> Result<Vec<TransactionSummary>, ServiceError> {
    let store = state.require_ledger_store().await?;
    if store.find_venue(venue_id).await?.is_none() {
        return Err(venue_not_found(venue_id));
    }

    let transactions = store
        .list_transactions(Some(venue_id), Default::default())
        .await?;
    Ok(transactions
        .into_iter()
        .filter(|transaction| MOVEMENT_KINDS.contains(&transaction.kind))
        .take(limit)
        .map(Into::into)
        .collect())
}

fn accreditation_transaction(venue: &VenueEntity, quantity: u32) -> TransactionEntity {
    TransactionEntity {
        id: Uuid::new_v4(),
        venue_id: venue.id,
        kind: TransactionKind::VenueAccreditation,
        quantity,
        unit_price: venue.sell_price,
        total: u64::from(quantity) * u64::from(venue.sell_price),
        description: Some(format!("Accredited {quantity} credits to the screen pool")),
        song_title: None,
        requested_by: None,
        created_at: SystemTime::now(),
    }
}

fn venue_not_found(venue_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("venue `{venue_id}` not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::ledger_store::memory::MemoryLedgerStore,
        dto::venue::CreateVenueRequest,
        services::venue_service,
        state::AppState,
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_ledger_store(Arc::new(MemoryLedgerStore::new()))
            .await;
        state
    }

    async fn create_venue(state: &SharedState) -> Uuid {
        venue_service::create_venue(
            state,
            CreateVenueRequest {
                name: "El Farol".into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn purchase_then_accredit_moves_credits_between_pools() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;

        let purchase = purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 100,
                unit_price: 40,
            },
        )
        .await
        .unwrap();
        assert_eq!(purchase.kind, TransactionKind::PlatformPurchase);
        assert_eq!(purchase.total, 4_000);

        let accreditation = accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 30 })
            .await
            .unwrap();
        assert_eq!(accreditation.kind, TransactionKind::VenueAccreditation);
        // Valued at the venue's default sell price.
        assert_eq!(
            accreditation.total,
            30 * u64::from(AppConfig::default().default_sell_price())
        );

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.platform_stock, 70);
        assert_eq!(venue.screen_pool, 30);
    }

    #[tokio::test]
    async fn accreditation_conserves_the_balance_sum() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;
        purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 50,
                unit_price: 40,
            },
        )
        .await
        .unwrap();

        let before = venue_service::get_venue(&state, venue_id).await.unwrap();
        accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 20 })
            .await
            .unwrap();
        let after = venue_service::get_venue(&state, venue_id).await.unwrap();

        assert_eq!(
            before.platform_stock + before.screen_pool,
            after.platform_stock + after.screen_pool
        );
    }

    #[tokio::test]
    async fn accrediting_more_than_stock_is_declined() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;
        purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 10,
                unit_price: 40,
            },
        )
        .await
        .unwrap();

        let err = accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 11 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                requested: 11,
                available: 10,
            }
        ));

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.platform_stock, 10);
        assert_eq!(venue.screen_pool, 0);
    }

    #[tokio::test]
    async fn reversing_a_purchase_takes_the_stock_back_floored() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;
        let purchase = purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 50,
                unit_price: 40,
            },
        )
        .await
        .unwrap();

        // Part of the stock has already been accredited away, so the reversal
        // cannot take back the full 50.
        accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 30 })
            .await
            .unwrap();

        reverse_transaction(&state, purchase.id).await.unwrap();

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.platform_stock, 0);
        assert_eq!(venue.screen_pool, 30);

        let remaining = list_transactions(&state, Default::default()).await.unwrap();
        assert!(remaining.iter().all(|transaction| transaction.id != purchase.id));
    }

    #[tokio::test]
    async fn reversing_an_accreditation_leaves_balances_alone() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;
        purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 50,
                unit_price: 40,
            },
        )
        .await
        .unwrap();
        let accreditation = accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 20 })
            .await
            .unwrap();

        reverse_transaction(&state, accreditation.id).await.unwrap();

        let venue = venue_service::get_venue(&state, venue_id).await.unwrap();
        assert_eq!(venue.platform_stock, 30);
        assert_eq!(venue.screen_pool, 20);
    }

    #[tokio::test]
    async fn transactions_can_be_filtered_by_kind() {
        let state = test_state().await;
        let venue_id = create_venue(&state).await;
        purchase_stock(
            &state,
            venue_id,
            PurchaseStockRequest {
                quantity: 50,
                unit_price: 40,
            },
        )
        .await
        .unwrap();
        accredit_to_screen(&state, venue_id, AccreditRequest { quantity: 20 })
            .await
            .unwrap();

        let query = TransactionFilterQuery {
            kind: Some(TransactionKind::PlatformPurchase),
            ..Default::default()
        };
        let purchases = list_transactions(&state, query).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].kind, TransactionKind::PlatformPurchase);
    }
}
