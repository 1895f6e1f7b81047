/// Billing access service
///
/// Invoices list by due date rather than creation time: `get_all` and
/// `get_by_student` show the latest due date first, `get_pending` the most
/// urgent first.

use super::repository::Repository;
use crate::backend::{Filter, TableBackend};
use crate::error::DataResult;
use crate::models::billing::{Billing, BillingStatus, CreateBilling, UpdateBilling};
use crate::resilience::ResiliencePolicy;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct BillingService {
    repo: Repository<Billing>,
}

impl BillingService {
    pub fn new(backend: Arc<dyn TableBackend>, policy: Arc<ResiliencePolicy>) -> Self {
        BillingService {
            repo: Repository::new(backend, policy),
        }
    }

    /// All invoices, latest due date first
    pub async fn get_all(&self) -> DataResult<Vec<Billing>> {
        self.repo
            .list(self.repo.query().order_desc("due_date").order_desc("created_at"))
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Billing>> {
        self.repo.find(&id).await
    }

    /// A student's invoices, latest due date first
    pub async fn get_by_student(&self, student_id: i64) -> DataResult<Vec<Billing>> {
        let query = self
            .repo
            .query()
            .eq("student_id", student_id)
            .order_desc("due_date");
        self.repo.list(query).await
    }

    /// Pending and overdue invoices, earliest due date first
    pub async fn get_pending(&self) -> DataResult<Vec<Billing>> {
        let outstanding = [BillingStatus::Pending, BillingStatus::Overdue]
            .iter()
            .map(ToString::to_string);
        let query = self
            .repo
            .query()
            .filter(Filter::is_in("status", outstanding))
            .order_asc("due_date");
        self.repo.list(query).await
    }

    /// Issues an invoice after validating it
    pub async fn create(&self, invoice: &CreateBilling) -> DataResult<Billing> {
        self.repo.insert(invoice).await
    }

    pub async fn update(&self, id: i64, update: &UpdateBilling) -> DataResult<Billing> {
        self.repo.patch(&id, update).await
    }

    /// Marks an invoice paid now with the given payment method
    pub async fn mark_as_paid(&self, id: i64, payment_method: &str) -> DataResult<Billing> {
        let update = UpdateBilling {
            status: Some(BillingStatus::Paid),
            payment_date: Some(Some(Utc::now())),
            payment_method: Some(Some(payment_method.to_string())),
            ..Default::default()
        };
        let invoice = self.repo.patch(&id, &update).await?;

        tracing::info!(invoice_id = id, method = %payment_method, "Invoice marked as paid");
        Ok(invoice)
    }

    /// Deletes an invoice; unknown ids are `NotFound`
    pub async fn delete(&self, id: i64) -> DataResult<()> {
        self.repo.remove(&id).await
    }
}
