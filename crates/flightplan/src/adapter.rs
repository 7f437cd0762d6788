//! Persistence adapter for flight plans.
//!
//! [`FlightPlanAdapter`] maps [`FlightPlan`] entities onto a
//! [`DocumentStore`] collection and reports the outcome of every mutation as a
//! [`TransactionResult`]. Filing and amending turn store faults into
//! [`TransactionResult::ServerError`]. Reads and deletes turn them into
//! [`Error::StoreUnavailable`].

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::FilingConfig;
use crate::error::{Error, Result};
use crate::mapping::{self, fields};
use crate::plan::FlightPlan;
use crate::store::{DocumentStore, Filter};

/// Outcome of a mutating adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionResult {
    /// The operation was fully applied.
    Success,
    /// The request was rejected, or the store gave no proof of the insert.
    BadRequest,
    /// No flight plan matches the identifier.
    NotFound,
    /// The store failed while applying the operation.
    ServerError,
}

impl TransactionResult {
    /// Check whether the operation was applied.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl std::fmt::Display for TransactionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::NotFound => write!(f, "not_found"),
            Self::ServerError => write!(f, "server_error"),
        }
    }
}

/// Result of filing a flight plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// How the filing went.
    pub result: TransactionResult,
    /// The identifier assigned to the new plan, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_plan_id: Option<String>,
}

impl FileOutcome {
    fn failed(result: TransactionResult) -> Self {
        Self {
            result,
            flight_plan_id: None,
        }
    }
}

/// Maps flight plans onto a document store collection.
///
/// The store handle is injected and shared; the adapter holds no other state,
/// so clones can be handed to concurrent tasks freely.
#[derive(Debug)]
pub struct FlightPlanAdapter<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    collection: String,
    policy: FilingConfig,
}

impl<S: DocumentStore + ?Sized> Clone for FlightPlanAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: DocumentStore + ?Sized> FlightPlanAdapter<S> {
    /// Create an adapter over `collection` in the given store.
    #[must_use]
    pub fn new(store: Arc<S>, collection: impl Into<String>, policy: FilingConfig) -> Self {
        Self {
            store,
            collection: collection.into(),
            policy,
        }
    }

    /// The collection this adapter reads and writes.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The shared store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Return every stored flight plan, in filing order.
    ///
    /// An empty collection yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the store cannot be queried, or a
    /// decode error if a stored document is malformed.
    pub async fn list_all(&self) -> Result<Vec<FlightPlan>> {
        let documents = self
            .store
            .find(&self.collection, &Filter::All)
            .await
            .map_err(|e| Self::store_fault("list_all", &e))?;

        debug!(
            "Listing {} flight plans from {}",
            documents.len(),
            self.collection
        );
        documents.iter().map(mapping::decode).collect()
    }

    /// Look up one flight plan by identifier.
    ///
    /// Returns `Ok(None)` when no plan has that identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the store cannot be queried, or a
    /// decode error if the stored document is malformed.
    pub async fn get_by_id(&self, flight_plan_id: &str) -> Result<Option<FlightPlan>> {
        let document = self
            .store
            .find_one(&self.collection, &Self::id_filter(flight_plan_id))
            .await
            .map_err(|e| Self::store_fault("get_by_id", &e))?;

        document.as_ref().map(mapping::decode).transpose()
    }

    /// File a new flight plan under a freshly generated identifier.
    ///
    /// Any identifier on `plan` is ignored. The result is
    /// [`TransactionResult::BadRequest`] if the plan fails validation or the
    /// store does not confirm the insert, and
    /// [`TransactionResult::ServerError`] if the store fails.
    pub async fn file(&self, plan: &FlightPlan) -> FileOutcome {
        if let Err(e) = plan.validate(&self.policy) {
            warn!("Rejected flight plan for {}: {}", plan.aircraft_identification, e);
            return FileOutcome::failed(TransactionResult::BadRequest);
        }

        let flight_plan_id = Uuid::new_v4().simple().to_string();
        let document = mapping::encode(&flight_plan_id, plan);

        match self.store.insert_one(&self.collection, document).await {
            Ok(ack) if ack.inserted_id.is_some() => {
                info!(
                    "Filed flight plan {} for {}",
                    flight_plan_id, plan.aircraft_identification
                );
                FileOutcome {
                    result: TransactionResult::Success,
                    flight_plan_id: Some(flight_plan_id),
                }
            }
            Ok(_) => {
                warn!(
                    "Store gave no storage id for flight plan {}",
                    flight_plan_id
                );
                FileOutcome::failed(TransactionResult::BadRequest)
            }
            Err(e) => {
                error!("Failed to file flight plan {}: {}", flight_plan_id, e);
                FileOutcome::failed(TransactionResult::ServerError)
            }
        }
    }

    /// Overwrite every field of an existing plan except its identifier.
    ///
    /// Returns [`TransactionResult::NotFound`] when nothing matches, and
    /// [`TransactionResult::Success`] when a plan matched, even if the new
    /// values equal the stored ones.
    pub async fn update(&self, flight_plan_id: &str, plan: &FlightPlan) -> TransactionResult {
        if let Err(e) = plan.validate(&self.policy) {
            warn!("Rejected update of flight plan {}: {}", flight_plan_id, e);
            return TransactionResult::BadRequest;
        }

        let outcome = match self
            .store
            .update_one(
                &self.collection,
                &Self::id_filter(flight_plan_id),
                mapping::encode_fields(plan),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to update flight plan {}: {}", flight_plan_id, e);
                return TransactionResult::ServerError;
            }
        };

        if outcome.matched_count == 0 {
            debug!("No flight plan {} to update", flight_plan_id);
            return TransactionResult::NotFound;
        }

        if outcome.modified_count == 0 {
            debug!("Flight plan {} already up to date", flight_plan_id);
        } else {
            info!("Updated flight plan {}", flight_plan_id);
        }
        TransactionResult::Success
    }

    /// Remove a flight plan.
    ///
    /// Returns `true` if a plan was removed, `false` if none matched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the store fails.
    pub async fn delete_by_id(&self, flight_plan_id: &str) -> Result<bool> {
        let deleted = self
            .store
            .delete_one(&self.collection, &Self::id_filter(flight_plan_id))
            .await
            .map_err(|e| Self::store_fault("delete_by_id", &e))?;

        if deleted > 0 {
            info!("Deleted flight plan {}", flight_plan_id);
        }
        Ok(deleted > 0)
    }

    /// Departure airport of a plan, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_by_id`].
    pub async fn departure_airport(&self, flight_plan_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_by_id(flight_plan_id)
            .await?
            .map(|plan| plan.departure_airport))
    }

    /// Route of a plan, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_by_id`].
    pub async fn route(&self, flight_plan_id: &str) -> Result<Option<String>> {
        Ok(self.get_by_id(flight_plan_id).await?.map(|plan| plan.route))
    }

    /// Estimated time en route of a plan, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_by_id`].
    pub async fn time_enroute(&self, flight_plan_id: &str) -> Result<Option<Duration>> {
        Ok(self
            .get_by_id(flight_plan_id)
            .await?
            .map(|plan| plan.time_enroute()))
    }

    fn id_filter(flight_plan_id: &str) -> Filter {
        Filter::eq(fields::FLIGHT_PLAN_ID, flight_plan_id)
    }

    fn store_fault(operation: &'static str, err: &Error) -> Error {
        error!("Document store failed during {}: {}", operation, err);
        Error::store_unavailable(operation, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::plan::tests::sample_plan;
    use crate::store::{
        Document, InsertAck, MemoryStore, SqliteStore, UpdateOutcome, STORAGE_ID_KEY,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const COLLECTION: &str = "flight_plan";

    fn memory_adapter() -> FlightPlanAdapter<MemoryStore> {
        init_test_logging();
        FlightPlanAdapter::new(
            Arc::new(MemoryStore::new()),
            COLLECTION,
            FilingConfig::default(),
        )
    }

    fn sqlite_adapter() -> FlightPlanAdapter<SqliteStore> {
        init_test_logging();
        FlightPlanAdapter::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            COLLECTION,
            FilingConfig::default(),
        )
    }

    /// Accepts inserts but never reports a storage id.
    #[derive(Debug, Default)]
    struct UnacknowledgedStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl DocumentStore for UnacknowledgedStore {
        fn backend_name(&self) -> &'static str {
            "unacknowledged"
        }

        async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
            self.inner.find(collection, filter).await
        }

        async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertAck> {
            self.inner.insert_one(collection, document).await?;
            Ok(InsertAck { inserted_id: None })
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: &Filter,
            set: Document,
        ) -> Result<UpdateOutcome> {
            self.inner.update_one(collection, filter, set).await
        }

        async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
            self.inner.delete_one(collection, filter).await
        }

        async fn count(&self, collection: &str) -> Result<u64> {
            self.inner.count(collection).await
        }
    }

    /// Fails every call, as an unreachable store would.
    #[derive(Debug)]
    struct FailingStore;

    #[async_trait::async_trait]
    impl DocumentStore for FailingStore {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        async fn find(&self, _collection: &str, _filter: &Filter) -> Result<Vec<Document>> {
            Err(Error::internal("connection refused"))
        }

        async fn insert_one(&self, _collection: &str, _document: Document) -> Result<InsertAck> {
            Err(Error::internal("connection refused"))
        }

        async fn update_one(
            &self,
            _collection: &str,
            _filter: &Filter,
            _set: Document,
        ) -> Result<UpdateOutcome> {
            Err(Error::internal("connection refused"))
        }

        async fn delete_one(&self, _collection: &str, _filter: &Filter) -> Result<u64> {
            Err(Error::internal("connection refused"))
        }

        async fn count(&self, _collection: &str) -> Result<u64> {
            Err(Error::internal("connection refused"))
        }
    }

    fn failing_adapter() -> FlightPlanAdapter<FailingStore> {
        init_test_logging();
        FlightPlanAdapter::new(Arc::new(FailingStore), COLLECTION, FilingConfig::default())
    }

    #[test]
    fn test_transaction_result_display() {
        assert_eq!(TransactionResult::Success.to_string(), "success");
        assert_eq!(TransactionResult::BadRequest.to_string(), "bad_request");
        assert_eq!(TransactionResult::NotFound.to_string(), "not_found");
        assert_eq!(TransactionResult::ServerError.to_string(), "server_error");
        assert!(TransactionResult::Success.is_success());
        assert!(!TransactionResult::NotFound.is_success());
    }

    #[test]
    fn test_file_outcome_serialize() {
        let outcome = FileOutcome::failed(TransactionResult::BadRequest);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, json!({"result": "bad_request"}));
    }

    #[tokio::test]
    async fn test_list_all_empty() {
        let adapter = memory_adapter();
        assert!(adapter.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_then_get_scenario() {
        let adapter = sqlite_adapter();
        let plan = sample_plan();

        let outcome = adapter.file(&plan).await;
        assert_eq!(outcome.result, TransactionResult::Success);
        let id = outcome.flight_plan_id.unwrap();
        assert_eq!(id.len(), 32);

        let stored = adapter.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored, plan.clone().with_id(id.clone()));
        assert_eq!(stored.route, plan.route);
        assert_eq!(stored.remarks, plan.remarks);
        assert_eq!(stored.time_enroute(), Duration::minutes(90));
    }

    #[tokio::test]
    async fn test_file_ignores_client_identifier() {
        let adapter = memory_adapter();
        let plan = sample_plan().with_id("client-chosen");

        let id = adapter.file(&plan).await.flight_plan_id.unwrap();
        assert_ne!(id, "client-chosen");
        assert!(adapter.get_by_id("client-chosen").await.unwrap().is_none());
        assert!(adapter.get_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_generates_unique_ids() {
        let adapter = memory_adapter();
        let first = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();
        let second = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        assert_ne!(first, second);
        assert_eq!(adapter.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_file_invalid_plan_is_bad_request() {
        let adapter = memory_adapter();
        let mut plan = sample_plan();
        plan.aircraft_identification = String::new();

        let outcome = adapter.file(&plan).await;
        assert_eq!(outcome.result, TransactionResult::BadRequest);
        assert!(outcome.flight_plan_id.is_none());
        assert_eq!(adapter.store().count(COLLECTION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_inverted_times_policy() {
        let mut plan = sample_plan();
        std::mem::swap(&mut plan.departure_time, &mut plan.arrival_time);

        let strict = memory_adapter();
        assert_eq!(
            strict.file(&plan).await.result,
            TransactionResult::BadRequest
        );

        let lenient = FlightPlanAdapter::new(
            Arc::new(MemoryStore::new()),
            COLLECTION,
            FilingConfig {
                reject_inverted_times: false,
                ..FilingConfig::default()
            },
        );
        let id = lenient.file(&plan).await.flight_plan_id.unwrap();
        assert_eq!(
            lenient.time_enroute(&id).await.unwrap(),
            Some(Duration::minutes(-90))
        );
    }

    #[tokio::test]
    async fn test_file_without_storage_ack_is_bad_request() {
        let adapter = FlightPlanAdapter::new(
            Arc::new(UnacknowledgedStore::default()),
            COLLECTION,
            FilingConfig::default(),
        );

        let outcome = adapter.file(&sample_plan()).await;
        assert_eq!(outcome.result, TransactionResult::BadRequest);
        assert!(outcome.flight_plan_id.is_none());
    }

    #[tokio::test]
    async fn test_file_unstorable_year_is_bad_request() {
        let adapter = memory_adapter();
        let mut plan = sample_plan();
        plan.departure_time = Utc.with_ymd_and_hms(10000, 1, 1, 10, 0, 0).unwrap();
        plan.arrival_time = Utc.with_ymd_and_hms(10000, 1, 1, 11, 30, 0).unwrap();

        let outcome = adapter.file(&plan).await;
        assert_eq!(outcome.result, TransactionResult::BadRequest);
        assert_eq!(adapter.store().count(COLLECTION).await.unwrap(), 0);
        assert!(adapter.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_absent() {
        let adapter = memory_adapter();
        adapter.file(&sample_plan()).await;
        assert!(adapter.get_by_id("never-filed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_changes_fields() {
        let adapter = sqlite_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        let mut amended = sample_plan();
        amended.altitude = 8500;
        amended.route = "DCT HFD DCT".to_string();
        amended.remarks = None;
        amended.arrival_time = Utc.with_ymd_and_hms(2024, 1, 1, 11, 45, 0).unwrap();

        assert_eq!(
            adapter.update(&id, &amended).await,
            TransactionResult::Success
        );

        let stored = adapter.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored, amended.with_id(id.clone()));
    }

    #[tokio::test]
    async fn test_update_never_changes_identifier() {
        let adapter = memory_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        let amended = sample_plan().with_id("other-id");
        assert_eq!(
            adapter.update(&id, &amended).await,
            TransactionResult::Success
        );

        let stored = adapter.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.flight_plan_id.as_deref(), Some(id.as_str()));
        assert!(adapter.get_by_id("other-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_identical_values_is_success() {
        let adapter = sqlite_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        assert_eq!(
            adapter.update(&id, &sample_plan()).await,
            TransactionResult::Success
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let adapter = memory_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        let mut amended = sample_plan();
        amended.altitude = 9500;
        assert_eq!(
            adapter.update("no-such-plan", &amended).await,
            TransactionResult::NotFound
        );

        let untouched = adapter.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(untouched.altitude, sample_plan().altitude);
    }

    #[tokio::test]
    async fn test_update_invalid_plan_is_bad_request() {
        let adapter = memory_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        let mut amended = sample_plan();
        amended.fuel_minutes = 75;
        assert_eq!(
            adapter.update(&id, &amended).await,
            TransactionResult::BadRequest
        );
        assert_eq!(
            adapter.get_by_id(&id).await.unwrap().unwrap().fuel_minutes,
            30
        );
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let adapter = sqlite_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        assert!(adapter.delete_by_id(&id).await.unwrap());
        assert!(adapter.get_by_id(&id).await.unwrap().is_none());
        assert!(!adapter.delete_by_id(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_store_unchanged() {
        let adapter = memory_adapter();
        adapter.file(&sample_plan()).await;

        assert!(!adapter.delete_by_id("no-such-plan").await.unwrap());
        assert_eq!(adapter.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_derived_queries() {
        let adapter = memory_adapter();
        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();

        assert_eq!(
            adapter.departure_airport(&id).await.unwrap().as_deref(),
            Some("KJFK")
        );
        assert_eq!(
            adapter.route(&id).await.unwrap().as_deref(),
            Some("DCT MERIT V229 PUT DCT")
        );
        assert_eq!(
            adapter.time_enroute(&id).await.unwrap(),
            Some(Duration::minutes(90))
        );

        assert!(adapter.departure_airport("missing").await.unwrap().is_none());
        assert!(adapter.route("missing").await.unwrap().is_none());
        assert!(adapter.time_enroute("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_store_mutations_are_server_errors() {
        let adapter = failing_adapter();

        assert_eq!(
            adapter.file(&sample_plan()).await.result,
            TransactionResult::ServerError
        );
        assert_eq!(
            adapter.update("abc", &sample_plan()).await,
            TransactionResult::ServerError
        );
    }

    #[tokio::test]
    async fn test_failing_store_reads_are_store_unavailable() {
        let adapter = failing_adapter();

        let err = adapter.list_all().await.unwrap_err();
        assert!(matches!(
            err,
            Error::StoreUnavailable {
                operation: "list_all",
                ..
            }
        ));
        assert!(adapter.get_by_id("abc").await.unwrap_err().is_store_unavailable());
        assert!(adapter.delete_by_id("abc").await.unwrap_err().is_store_unavailable());
        assert!(adapter.route("abc").await.unwrap_err().is_store_unavailable());
    }

    #[tokio::test]
    async fn test_malformed_document_is_decode_error() {
        let adapter = memory_adapter();
        let mut document = mapping::encode("legacy", &sample_plan());
        document.remove(fields::ESTIMATED_ARRIVAL_TIME);
        document.insert(STORAGE_ID_KEY.to_string(), json!("1"));
        adapter
            .store()
            .insert_one(COLLECTION, document)
            .await
            .unwrap();

        assert!(adapter.get_by_id("legacy").await.unwrap_err().is_decode_error());
        assert!(adapter.list_all().await.unwrap_err().is_decode_error());
    }

    #[tokio::test]
    async fn test_adapter_over_dyn_store() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let adapter = FlightPlanAdapter::new(store, COLLECTION, FilingConfig::default());

        let id = adapter.file(&sample_plan()).await.flight_plan_id.unwrap();
        assert!(adapter.get_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_filing_from_clones() {
        let adapter = sqlite_adapter();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let adapter = adapter.clone();
                tokio::spawn(async move {
                    let mut plan = sample_plan();
                    plan.aircraft_identification = format!("N{i:05}");
                    adapter.file(&plan).await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().result.is_success());
        }
        assert_eq!(adapter.list_all().await.unwrap().len(), 8);
    }
}
