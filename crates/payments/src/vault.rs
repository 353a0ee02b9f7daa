//! Customer vault: the user-to-processor-customer mapping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// One registered payment customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub user_id: UserId,
    pub email: String,
    /// The processor-side customer handle, e.g. `cus_0001`.
    pub customer_ref: String,
}

/// Trait for the customer vault.
///
/// Registration is register-once: a second attempt for the same user is
/// a conflict, never a silent overwrite of the processor handle.
#[async_trait]
pub trait CustomerVault: Send + Sync {
    /// Registers a payment customer for the user.
    async fn register(
        &self,
        user_id: UserId,
        email: &str,
        customer_ref: &str,
    ) -> Result<CustomerRecord, PaymentError>;

    /// Fetches the payment customer for the user.
    async fn get(&self, user_id: UserId) -> Result<CustomerRecord, PaymentError>;
}

/// In-memory vault for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerVault {
    state: Arc<RwLock<HashMap<UserId, CustomerRecord>>>,
}

impl InMemoryCustomerVault {
    /// Creates a new empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered customers.
    pub fn customer_count(&self) -> usize {
        self.state.read().unwrap().len()
    }
}

#[async_trait]
impl CustomerVault for InMemoryCustomerVault {
    async fn register(
        &self,
        user_id: UserId,
        email: &str,
        customer_ref: &str,
    ) -> Result<CustomerRecord, PaymentError> {
        let mut state = self.state.write().unwrap();
        if state.contains_key(&user_id) {
            return Err(PaymentError::CustomerExists(user_id));
        }
        let record = CustomerRecord {
            user_id,
            email: email.to_string(),
            customer_ref: customer_ref.to_string(),
        };
        state.insert(user_id, record.clone());
        Ok(record)
    }

    async fn get(&self, user_id: UserId) -> Result<CustomerRecord, PaymentError> {
        self.state
            .read()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(PaymentError::NoCustomer(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_get() {
        let vault = InMemoryCustomerVault::new();
        vault
            .register(UserId::new(42), "ada@example.com", "cus_0001")
            .await
            .unwrap();

        let record = vault.get(UserId::new(42)).await.unwrap();
        assert_eq!(record.customer_ref, "cus_0001");
        assert_eq!(record.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_register_twice_is_conflict() {
        let vault = InMemoryCustomerVault::new();
        vault
            .register(UserId::new(42), "ada@example.com", "cus_0001")
            .await
            .unwrap();

        let err = vault
            .register(UserId::new(42), "ada@example.com", "cus_0002")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::CustomerExists(_)));

        // The original handle survives the failed re-registration.
        let record = vault.get(UserId::new(42)).await.unwrap();
        assert_eq!(record.customer_ref, "cus_0001");
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let vault = InMemoryCustomerVault::new();
        let err = vault.get(UserId::new(9)).await.unwrap_err();
        assert!(matches!(err, PaymentError::NoCustomer(_)));
    }
}
