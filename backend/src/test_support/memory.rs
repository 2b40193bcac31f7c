//! In-memory persistence doubles.
//!
//! [`InMemoryStore`] implements both repository ports over shared vectors and
//! enforces ticket uniqueness like the database index does, so contention
//! scenarios behave as they would against PostgreSQL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

use crate::domain::ports::{
    PatientRepository, PatientRepositoryError, StageCount, VisitRepository, VisitRepositoryError,
};
use crate::domain::{Patient, Visit, VisitDetails, VisitStage};

#[derive(Debug, Default)]
struct Tables {
    patients: HashMap<Uuid, Patient>,
    /// Insertion order breaks `created_at` ties.
    visits: Vec<Visit>,
}

#[derive(Debug, Default)]
struct ReadGate {
    barrier: Option<Arc<Barrier>>,
    remaining: usize,
}

/// Shared in-memory patient and visit tables.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    failing_reads: AtomicU32,
    read_gate: Mutex<ReadGate>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` last-ticket reads fail with a connection error.
    pub fn fail_next_ticket_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Hold the next `count` last-ticket reads until all of them arrived.
    pub fn gate_next_ticket_reads(&self, count: usize) {
        let mut gate = self.lock_gate();
        gate.barrier = Some(Arc::new(Barrier::new(count)));
        gate.remaining = count;
    }

    /// Stored visits in insertion order.
    pub fn visits(&self) -> Vec<Visit> {
        self.lock_tables().visits.clone()
    }

    /// Number of registered patients.
    pub fn patient_count(&self) -> usize {
        self.lock_tables().patients.len()
    }

    fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("store mutex"),
        }
    }

    fn lock_gate(&self) -> MutexGuard<'_, ReadGate> {
        match self.read_gate.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("gate mutex"),
        }
    }

    fn take_gate(&self) -> Option<Arc<Barrier>> {
        let mut gate = self.lock_gate();
        if gate.remaining == 0 {
            return None;
        }
        gate.remaining -= 1;
        let barrier = gate.barrier.clone();
        if gate.remaining == 0 {
            gate.barrier = None;
        }
        barrier
    }

    fn consume_failure(&self) -> bool {
        self.failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
    }

    fn details(tables: &Tables, visit: &Visit) -> Option<VisitDetails> {
        tables
            .patients
            .get(&visit.patient_id())
            .map(|patient| VisitDetails {
                visit: visit.clone(),
                patient: patient.clone(),
            })
    }
}

#[async_trait]
impl PatientRepository for InMemoryStore {
    async fn insert(&self, patient: &Patient) -> Result<(), PatientRepositoryError> {
        self.lock_tables()
            .patients
            .insert(patient.id(), patient.clone());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PatientRepositoryError> {
        self.lock_tables().patients.remove(id);
        Ok(())
    }
}

#[async_trait]
impl VisitRepository for InMemoryStore {
    async fn last_ticket_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, VisitRepositoryError> {
        let gate = self.take_gate();
        if self.consume_failure() {
            return Err(VisitRepositoryError::connection("store offline"));
        }

        // Gated readers all snapshot before any of them proceeds to insert.
        let newest = {
            let tables = self.lock_tables();
            tables
                .visits
                .iter()
                .enumerate()
                .filter(|(_, visit)| visit.created_at() >= since)
                .max_by_key(|(index, visit)| (visit.created_at(), *index))
                .map(|(_, visit)| visit.ticket_code().to_owned())
        };
        if let Some(barrier) = gate {
            barrier.wait().await;
        }
        Ok(newest)
    }

    async fn insert(&self, visit: &Visit) -> Result<(), VisitRepositoryError> {
        let mut tables = self.lock_tables();
        if tables
            .visits
            .iter()
            .any(|existing| {
                existing.ticket_day() == visit.ticket_day()
                    && existing.ticket_code() == visit.ticket_code()
            })
        {
            return Err(VisitRepositoryError::duplicate_ticket(visit.ticket_code()));
        }
        tables.visits.push(visit.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        let tables = self.lock_tables();
        Ok(tables
            .visits
            .iter()
            .find(|visit| visit.id() == *id)
            .and_then(|visit| Self::details(&tables, visit)))
    }

    async fn find_by_ticket_codes_since(
        &self,
        ticket_codes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        let tables = self.lock_tables();
        Ok(tables
            .visits
            .iter()
            .filter(|visit| visit.created_at() >= since)
            .filter(|visit| ticket_codes.iter().any(|code| code == visit.ticket_code()))
            .max_by_key(|visit| visit.created_at())
            .and_then(|visit| Self::details(&tables, visit)))
    }

    async fn advance_stage(
        &self,
        id: &Uuid,
        from: VisitStage,
        to: VisitStage,
        at: DateTime<Utc>,
    ) -> Result<bool, VisitRepositoryError> {
        let mut tables = self.lock_tables();
        let Some(visit) = tables
            .visits
            .iter_mut()
            .find(|visit| visit.id() == *id && visit.stage() == from)
        else {
            return Ok(false);
        };
        *visit = visit.with_stage(to, at);
        Ok(true)
    }

    async fn list_active_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<VisitDetails>, VisitRepositoryError> {
        let tables = self.lock_tables();
        let mut active: Vec<_> = tables
            .visits
            .iter()
            .filter(|visit| visit.created_at() >= since && visit.stage().is_active())
            .filter_map(|visit| Self::details(&tables, visit))
            .collect();
        active.sort_by_key(|details| details.visit.created_at());
        Ok(active)
    }

    async fn count_by_stage_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StageCount>, VisitRepositoryError> {
        let tables = self.lock_tables();
        let mut counts: HashMap<VisitStage, u64> = HashMap::new();
        for visit in tables.visits.iter().filter(|visit| visit.created_at() >= since) {
            *counts.entry(visit.stage()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(stage, count)| StageCount { stage, count })
            .collect())
    }
}
