// Value sinks - push withdrawn value out to the destination account
// The ledger calls exactly one sink per withdrawal, after the debit is committed

use crate::identity::AccountId;
use crate::ledger::{Amount, Ledger};
use std::collections::HashMap;

// ============================================================================
// VALUE SINK TRAIT
// ============================================================================

/// The environment's value-transfer mechanism
pub trait ValueSink {
    /// Deliver `amount` to `to`
    ///
    /// Receives the ledger so a recipient hook can call back into it; any
    /// such call sees the withdrawal's debit already applied. Returns an
    /// error message if the value could not be delivered.
    fn release(&mut self, ledger: &mut Ledger, to: &AccountId, amount: Amount) -> Result<(), String>;
}

// ============================================================================
// DIRECT SINK
// ============================================================================

/// Fire-and-forget transfer with no recipient logic in the critical path
///
/// Never touches the ledger it is given. Keeps a tally of what each account
/// has been paid out.
#[derive(Clone, Debug, Default)]
pub struct DirectSink {
    payouts: HashMap<AccountId, Amount>,
    total_released: Amount,
    transfers: u64,
}

impl DirectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value delivered to an account
    pub fn released_to(&self, account: &AccountId) -> Amount {
        self.payouts.get(account).copied().unwrap_or(0)
    }

    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// Number of successful transfers
    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

impl ValueSink for DirectSink {
    fn release(&mut self, _ledger: &mut Ledger, to: &AccountId, amount: Amount) -> Result<(), String> {
        let paid = self
            .released_to(to)
            .checked_add(amount)
            .ok_or_else(|| format!("payout tally for {} would overflow", to))?;
        let total = self
            .total_released
            .checked_add(amount)
            .ok_or_else(|| "total payout tally would overflow".to_string())?;

        self.payouts.insert(*to, paid);
        self.total_released = total;
        self.transfers += 1;
        Ok(())
    }
}

// ============================================================================
// MOCK SINK
// ============================================================================

type Hook = Box<dyn FnMut(&mut Ledger, &AccountId, Amount)>;

/// Configurable sink for exercising the withdrawal protocol
pub struct MockSink {
    should_succeed: bool,
    failure_message: Option<String>,
    failures_before_success: usize,
    call_count: usize,
    hook: Option<Hook>,
    delivered: Vec<(AccountId, Amount)>,
}

impl MockSink {
    /// Create a mock sink that always succeeds
    pub fn new() -> Self {
        Self {
            should_succeed: true,
            failure_message: None,
            failures_before_success: 0,
            call_count: 0,
            hook: None,
            delivered: Vec::new(),
        }
    }

    /// Configure to always fail with a message
    pub fn with_failure(mut self, message: &str) -> Self {
        self.should_succeed = false;
        self.failure_message = Some(message.to_string());
        self
    }

    /// Fail N times, then succeed
    pub fn with_failures_then_success(mut self, failures: usize) -> Self {
        self.should_succeed = true;
        self.failures_before_success = failures;
        self
    }

    /// Run `hook` as the recipient's receive logic before reporting back
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Ledger, &AccountId, Amount) + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Number of times `release` was called
    pub fn call_count(&self) -> usize {
        self.call_count
    }

    /// Transfers that reported success, in order
    pub fn delivered(&self) -> &[(AccountId, Amount)] {
        &self.delivered
    }

    fn failure(&self) -> String {
        self.failure_message
            .clone()
            .unwrap_or_else(|| "Mock failure".to_string())
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSink")
            .field("should_succeed", &self.should_succeed)
            .field("call_count", &self.call_count)
            .field("has_hook", &self.hook.is_some())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl ValueSink for MockSink {
    fn release(&mut self, ledger: &mut Ledger, to: &AccountId, amount: Amount) -> Result<(), String> {
        let call_num = self.call_count;
        self.call_count += 1;

        if let Some(hook) = self.hook.as_mut() {
            hook(ledger, to, amount);
        }

        if call_num < self.failures_before_success || !self.should_succeed {
            return Err(self.failure());
        }

        self.delivered.push((*to, amount));
        Ok(())
    }
}
