//! Two-phase ticket purchase.
//!
//! A `buy_ticket` call never completes a transaction: it returns a
//! confirmation-request string telling the assistant to ask the user
//! first. Only the distinct `confirm_ticket_purchase` call reaches the
//! side-effecting purchase gateway. Splitting the irreversible action
//! into a propose/confirm pair keeps a single ambiguous model decision
//! from buying anything.

use async_trait::async_trait;
use marquee_core::error::FunctionError;
use marquee_core::function::MovieFunction;
use std::sync::Arc;
use tracing::info;

/// The side-effecting purchase backend.
///
/// A trait seam so tests can observe exactly when a purchase happens.
#[async_trait]
pub trait PurchaseGateway: Send + Sync {
    async fn purchase(
        &self,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, FunctionError>;
}

/// Default gateway: confirms the purchase textually.
///
/// A production deployment would swap in a real ticketing integration.
pub struct StubPurchaseGateway;

#[async_trait]
impl PurchaseGateway for StubPurchaseGateway {
    async fn purchase(
        &self,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, FunctionError> {
        Ok(format!(
            "Ticket purchased for {movie} at {theater} for {showtime}."
        ))
    }
}

/// Phase one: propose. No side effects.
pub struct ProposeTicketPurchase;

#[async_trait]
impl MovieFunction for ProposeTicketPurchase {
    fn name(&self) -> &str {
        "buy_ticket"
    }

    fn parameters(&self) -> &[&str] {
        &["theater", "movie", "showtime"]
    }

    fn description(&self) -> &str {
        "Start a ticket purchase. The user must confirm before anything is bought."
    }

    async fn call(&self, args: &[String]) -> Result<String, FunctionError> {
        let [theater, movie, showtime] = args else {
            return Err(FunctionError::InvalidArguments(format!(
                "buy_ticket expects (theater, movie, showtime), got {} argument(s)",
                args.len()
            )));
        };

        info!(%theater, %movie, %showtime, "Purchase proposed; awaiting user confirmation");

        Ok(format!(
            "Ask the user if they really want to buy the ticket for {movie} at {theater} on \
             {showtime}. If they confirm, call confirm_ticket_purchase()."
        ))
    }
}

/// Phase two: confirm. Invokes the real purchase gateway.
pub struct ConfirmTicketPurchase {
    gateway: Arc<dyn PurchaseGateway>,
}

impl ConfirmTicketPurchase {
    pub fn new(gateway: Arc<dyn PurchaseGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl MovieFunction for ConfirmTicketPurchase {
    fn name(&self) -> &str {
        "confirm_ticket_purchase"
    }

    fn parameters(&self) -> &[&str] {
        &["theater", "movie", "showtime"]
    }

    fn description(&self) -> &str {
        "Complete a ticket purchase the user has already confirmed."
    }

    async fn call(&self, args: &[String]) -> Result<String, FunctionError> {
        let [theater, movie, showtime] = args else {
            return Err(FunctionError::InvalidArguments(format!(
                "confirm_ticket_purchase expects (theater, movie, showtime), got {} argument(s)",
                args.len()
            )));
        };

        info!(%theater, %movie, %showtime, "Completing confirmed purchase");

        let mut receipt = self.gateway.purchase(theater, movie, showtime).await?;
        // Keeps the model from disclaiming the purchase it just made.
        receipt.push_str("\nTell the user the purchase went through.");
        Ok(receipt)
    }
}
