//! Reference "is this email already registered?" service.

use std::time::Duration;

use freelando_forms::{BoxFuture, ExistenceCheck, LookupError};

/// Latency simulated by [`RegisteredEmails::new`].
pub const DEFAULT_LATENCY: Duration = Duration::from_secs(1);

/// Addresses that are already registered in the reference service.
pub const REGISTERED_EMAILS: [&str; 2] = ["f@g.com", "admin@admin.gov"];

/// A fixed set of registered addresses answered after a simulated delay.
#[derive(Debug, Clone)]
pub struct RegisteredEmails {
    emails: Vec<String>,
    latency: Duration,
}

impl Default for RegisteredEmails {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisteredEmails {
    /// The reference set with [`DEFAULT_LATENCY`].
    pub fn new() -> Self {
        Self {
            emails: REGISTERED_EMAILS.iter().map(|e| (*e).to_string()).collect(),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Sets the simulated latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Adds a registered address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into().to_lowercase());
        self
    }
}

impl ExistenceCheck for RegisteredEmails {
    fn exists<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, Result<bool, LookupError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let wanted = identifier.to_lowercase();
            Ok(self.emails.iter().any(|e| *e == wanted))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_addresses() {
        let emails = RegisteredEmails::new().with_latency(Duration::ZERO);
        assert!(emails.exists("f@g.com").await.unwrap());
        assert!(emails.exists("ADMIN@admin.gov").await.unwrap());
        assert!(!emails.exists("ana@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_added_address() {
        let emails = RegisteredEmails::new()
            .with_latency(Duration::from_millis(5))
            .with_email("Ana@Example.com");
        assert!(emails.exists("ana@example.com").await.unwrap());
    }
}
