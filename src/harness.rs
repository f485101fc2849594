// Harness - scripted driver for the ledger
//
// Plays the part of the execution environment: named signer accounts,
// signed invocations checked by a gatekeeper, a direct value sink, and a
// small line-oriented script language for deposits, withdrawals and checks.

use crate::config::{BankConfig, ConfigError};
use crate::identity::{AccountId, Call, Gatekeeper, Invocation, InvocationError, Keypair};
use crate::ledger::{Amount, Ledger, LedgerError};
use crate::transfer::DirectSink;
use crate::units::{format_units, parse_units, UnitsError};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// The scenario the ledger is calibrated against
pub const CALIBRATION_SCRIPT: &str = "\
# fresh accounts start at zero
expect alice 0
expect bob 0

deposit alice 1.0
expect alice 1.0

# repeated deposits accumulate, other accounts are untouched
deposit bob 0.5
deposit bob 0.5
expect bob 1.0
expect alice 1.0

withdraw alice 0.5
expect alice 0.5

# over-withdrawal is refused and changes nothing
expect-fail bob withdraw 2.0
expect bob 1.0
";

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Line {line}: expectation failed: {message}")]
    ExpectationFailed { line: usize, message: String },

    #[error("Invalid amount: {0}")]
    Units(#[from] UnitsError),

    #[error("Invocation rejected: {0}")]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// SCRIPT COMMANDS
// ============================================================================

/// Ledger operation named in a script
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Deposit { amount: Amount, attached: Amount },
    Withdraw { amount: Amount },
}

impl Operation {
    fn call(self) -> Call {
        match self {
            Operation::Deposit { amount, attached } => Call::Deposit { amount, attached },
            Operation::Withdraw { amount } => Call::Withdraw { amount },
        }
    }
}

/// One parsed script line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run an operation; a ledger failure is recorded, not fatal
    Run { name: String, operation: Operation },
    /// Read a balance
    Balance { name: String },
    /// Require a balance
    Expect { name: String, amount: Amount },
    /// Require an operation to fail
    ExpectFail { name: String, operation: Operation },
}

impl Command {
    /// Parse a script line; blank lines and `#` comments yield `None`
    pub fn parse(text: &str, line: usize, decimals: u8) -> Result<Option<Self>, HarnessError> {
        let text = text.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            return Ok(None);
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let command = match words.as_slice() {
            ["balance", name] => Command::Balance {
                name: name.to_string(),
            },
            ["expect", name, amount] => Command::Expect {
                name: name.to_string(),
                amount: parse_units(amount, decimals)?,
            },
            ["expect-fail", name, op, args @ ..] => Command::ExpectFail {
                name: name.to_string(),
                operation: parse_operation(op, args, decimals)
                    .ok_or_else(|| malformed(line, text))??,
            },
            [op @ ("deposit" | "withdraw"), name, args @ ..] => Command::Run {
                name: name.to_string(),
                operation: parse_operation(op, args, decimals)
                    .ok_or_else(|| malformed(line, text))??,
            },
            _ => {
                return Err(HarnessError::Parse {
                    line,
                    message: format!("unknown command '{}'", text),
                })
            }
        };

        Ok(Some(command))
    }
}

fn malformed(line: usize, text: &str) -> HarnessError {
    HarnessError::Parse {
        line,
        message: format!("malformed operation '{}'", text),
    }
}

/// `deposit <amount> [attached]` or `withdraw <amount>`; `None` if the shape is wrong
fn parse_operation(op: &str, args: &[&str], decimals: u8) -> Option<Result<Operation, HarnessError>> {
    let parse = |text: &str| parse_units(text, decimals).map_err(HarnessError::from);

    let operation = match (op, args) {
        ("deposit", [amount]) => parse(*amount).map(|amount| Operation::Deposit {
            amount,
            attached: amount,
        }),
        ("deposit", [amount, attached]) => parse(*amount).and_then(|amount| {
            Ok(Operation::Deposit {
                amount,
                attached: parse(*attached)?,
            })
        }),
        ("withdraw", [amount]) => parse(*amount).map(|amount| Operation::Withdraw { amount }),
        _ => return None,
    };
    Some(operation)
}

// ============================================================================
// TRANSCRIPT
// ============================================================================

/// What happened on one script line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed { name: String, operation: Operation },
    Rejected { name: String, operation: Operation, error: LedgerError },
    Balance { name: String, amount: Amount },
    Matched { name: String, amount: Amount },
    FailedAsExpected { name: String, error: LedgerError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub outcome: Outcome,
}

/// Ordered record of a script run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    steps: Vec<Step>,
}

impl Transcript {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ledger operations that were refused outside an `expect-fail`
    pub fn rejections(&self) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Rejected { .. }))
    }
}

// ============================================================================
// HARNESS
// ============================================================================

struct NamedSigner {
    keypair: Keypair,
    account: AccountId,
    next_nonce: u64,
}

/// A ledger plus everything a script needs to drive it
pub struct Harness {
    config: BankConfig,
    ledger: Ledger,
    sink: DirectSink,
    gatekeeper: Gatekeeper,
    signers: BTreeMap<String, NamedSigner>,
}

impl Harness {
    /// Deploy a fresh, empty ledger
    pub fn new(config: BankConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        info!(decimals = config.decimals, symbol = %config.symbol, "ledger deployed");

        Ok(Self {
            config,
            ledger: Ledger::new(),
            sink: DirectSink::new(),
            gatekeeper: Gatekeeper::new(),
            signers: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn sink(&self) -> &DirectSink {
        &self.sink
    }

    /// Address of a named signer, if it has been used
    pub fn account_of(&self, name: &str) -> Option<AccountId> {
        self.signers.get(name).map(|s| s.account)
    }

    /// Named signers and their addresses, sorted by name
    pub fn signers(&self) -> impl Iterator<Item = (&str, &AccountId)> {
        self.signers.iter().map(|(name, s)| (name.as_str(), &s.account))
    }

    /// Address of a named signer, creating a fresh keypair on first use
    pub fn signer(&mut self, name: &str) -> AccountId {
        self.named(name).account
    }

    fn named(&mut self, name: &str) -> &mut NamedSigner {
        self.signers.entry(name.to_string()).or_insert_with(|| {
            let keypair = Keypair::generate();
            let account = AccountId::from_public_key(&keypair.public_key());
            info!(name, %account, "signer created");
            NamedSigner {
                keypair,
                account,
                next_nonce: 1,
            }
        })
    }

    pub fn balance(&mut self, name: &str) -> Amount {
        let account = self.signer(name);
        self.ledger.balance_of(&account)
    }

    /// Sign `operation` as `name`, admit it through the gatekeeper and run it
    ///
    /// The outer error is an environment failure; the inner result is the
    /// ledger's verdict.
    pub fn invoke(&mut self, name: &str, operation: Operation) -> Result<Result<(), LedgerError>, HarnessError> {
        let signer = self.named(name);
        let invocation = Invocation::sign(&signer.keypair, signer.next_nonce, operation.call())?;
        signer.next_nonce += 1;

        let caller = self.gatekeeper.admit(&invocation)?;
        let verdict = match *caller.call() {
            Call::Deposit { amount, attached } => self.ledger.deposit(caller.account(), amount, attached),
            Call::Withdraw { amount } => self.ledger.withdraw(caller.account(), amount, &mut self.sink),
        };
        Ok(verdict)
    }

    /// Run every line of a script, stopping at the first harness error
    pub fn run_script(&mut self, script: &str) -> Result<Transcript, HarnessError> {
        let mut transcript = Transcript::default();

        for (index, text) in script.lines().enumerate() {
            let line = index + 1;
            let Some(command) = Command::parse(text, line, self.config.decimals)? else {
                continue;
            };

            let outcome = self.execute(line, command)?;
            transcript.steps.push(Step { line, outcome });
        }

        Ok(transcript)
    }

    /// Read and run a script file
    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Transcript, HarnessError> {
        let script = std::fs::read_to_string(path)?;
        self.run_script(&script)
    }

    fn execute(&mut self, line: usize, command: Command) -> Result<Outcome, HarnessError> {
        match command {
            Command::Run { name, operation } => match self.invoke(&name, operation)? {
                Ok(()) => {
                    info!(line, name = %name, ?operation, "operation completed");
                    Ok(Outcome::Completed { name, operation })
                }
                Err(error) => {
                    warn!(line, name = %name, %error, "operation failed");
                    Ok(Outcome::Rejected { name, operation, error })
                }
            },
            Command::Balance { name } => {
                let amount = self.balance(&name);
                Ok(Outcome::Balance { name, amount })
            }
            Command::Expect { name, amount } => {
                let actual = self.balance(&name);
                if actual != amount {
                    return Err(HarnessError::ExpectationFailed {
                        line,
                        message: format!(
                            "{} has {}, expected {}",
                            name,
                            self.display_amount(actual),
                            self.display_amount(amount)
                        ),
                    });
                }
                Ok(Outcome::Matched { name, amount })
            }
            Command::ExpectFail { name, operation } => match self.invoke(&name, operation)? {
                Ok(()) => Err(HarnessError::ExpectationFailed {
                    line,
                    message: format!("{:?} by {} succeeded", operation, name),
                }),
                Err(error) => {
                    info!(line, name = %name, %error, "operation failed as expected");
                    Ok(Outcome::FailedAsExpected { name, error })
                }
            },
        }
    }

    /// Format an amount in major units with the configured symbol
    pub fn display_amount(&self, amount: Amount) -> String {
        match format_units(amount, self.config.decimals) {
            Ok(text) => format!("{} {}", text, self.config.symbol),
            Err(_) => amount.to_string(),
        }
    }

    /// Human-readable rendering of a transcript
    pub fn render(&self, transcript: &Transcript) -> String {
        let mut out = String::new();
        for step in transcript.steps() {
            let text = match &step.outcome {
                Outcome::Completed { name, operation } => {
                    format!("{} {}", name, self.describe(operation))
                }
                Outcome::Rejected { name, operation, error } => {
                    format!("{} could not {}: {}", name, self.describe(operation), error)
                }
                Outcome::Balance { name, amount } => {
                    format!("{} balance: {}", name, self.display_amount(*amount))
                }
                Outcome::Matched { name, amount } => {
                    format!("{} balance is {} as expected", name, self.display_amount(*amount))
                }
                Outcome::FailedAsExpected { name, error } => {
                    format!("{} failed as expected: {}", name, error)
                }
            };
            let _ = writeln!(out, "[{:>3}] {}", step.line, text);
        }
        out
    }

    fn describe(&self, operation: &Operation) -> String {
        match operation {
            Operation::Deposit { amount, attached } if amount == attached => {
                format!("deposit {}", self.display_amount(*amount))
            }
            Operation::Deposit { amount, attached } => format!(
                "deposit {} (attached {})",
                self.display_amount(*amount),
                self.display_amount(*attached)
            ),
            Operation::Withdraw { amount } => format!("withdraw {}", self.display_amount(*amount)),
        }
    }
}
