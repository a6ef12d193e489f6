//! Vote store and query engine
//!
//! [`VoteContract`] is the entry point the host calls. `init` stores the
//! organization allow-list; `invoke` dispatches to `cast`, `query` or `tally`
//! and turns the outcome into a [`Response`].
//!
//! Ballots are stored under composite keys `Vote | question | organization |
//! user` with the answer as the raw value, so a question or a
//! question/organization pair maps to one contiguous key range.

use crate::authorization::AuthorizationGate;
use crate::config::{AuthorizationMode, ContractConfig, RecastPolicy};
use crate::identity::extract_identity;
use crate::keys::{KeyRange, KeySchema};
use crate::ledger::{Ledger, ScanGuard};
use crate::types::{Tally, Vote, VoteKey};
use crate::{Error, Result, invalid_argument};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Components in a ballot key: question, organization, user
const VOTE_KEY_ARITY: usize = 3;

/// Most filters a query accepts: question, then organization
const MAX_QUERY_FILTERS: usize = 2;

/// Invoke function names
pub const FN_CAST: &str = "cast";
pub const FN_QUERY: &str = "query";
pub const FN_TALLY: &str = "tally";

/// One inbound request, scoped to a host transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Host transaction id and time, used only for tracing
    pub tx_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<S: Into<String>>(
        function: impl Into<String>,
        args: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a raw argument vector whose first element is the function name
    pub fn from_args<S: Into<String>>(raw: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut raw = raw.into_iter().map(Into::into);
        let function: String = raw
            .next()
            .ok_or_else(|| invalid_argument!("missing function name"))?;
        Ok(Self::new(function, raw))
    }
}

/// Outcome of `init` or `invoke`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub payload: Option<Vec<u8>>,
}

impl Response {
    pub const OK: u16 = 200;
    /// Statuses at or above this are failures
    pub const ERROR_THRESHOLD: u16 = 400;

    pub fn success(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Self::OK,
            message: String::new(),
            payload,
        }
    }

    pub fn from_error(error: &Error) -> Self {
        Self {
            status: error.status(),
            message: error.to_string(),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status < Self::ERROR_THRESHOLD
    }

    /// Deserialize a JSON payload
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self
            .payload
            .as_deref()
            .ok_or_else(|| Error::value_decode("response carries no payload"))?;
        Ok(serde_json::from_slice(payload)?)
    }
}

/// The ballot contract
#[derive(Debug, Clone)]
pub struct VoteContract {
    config: ContractConfig,
    votes: KeySchema,
    gate: Option<AuthorizationGate>,
}

impl VoteContract {
    pub fn new(config: ContractConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Contract with the default allow-list configuration
    pub fn for_testing() -> Self {
        Self::from_validated(ContractConfig::for_testing())
    }

    fn from_validated(config: ContractConfig) -> Self {
        let votes = KeySchema::new(&config.vote_namespace, VOTE_KEY_ARITY);
        let gate = match config.authorization {
            AuthorizationMode::AllowList => Some(AuthorizationGate::new(&config.allowed_orgs_key)),
            AuthorizationMode::Open => None,
        };
        Self {
            config,
            votes,
            gate,
        }
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// One-time instantiation: store the organization allow-list
    pub fn init<L: Ledger + ?Sized>(&self, ledger: &mut L, allowed_orgs: &[String]) -> Response {
        let span = info_span!("init", organizations = allowed_orgs.len());
        let _enter = span.enter();

        let result = match &self.gate {
            Some(gate) => gate.initialize(ledger, allowed_orgs),
            None => {
                info!("Authorization disabled; allow-list not stored");
                Ok(())
            }
        };

        match result {
            Ok(()) => Response::success(None),
            Err(e) => {
                warn!("init failed: {}", e);
                Response::from_error(&e)
            }
        }
    }

    /// Dispatch an invocation by function name
    pub fn invoke<L: Ledger + ?Sized>(&self, ledger: &mut L, invocation: &Invocation) -> Response {
        let span = info_span!(
            "invoke",
            tx_id = %invocation.tx_id,
            timestamp = %invocation.timestamp,
            function = %invocation.function
        );
        let _enter = span.enter();

        match self.dispatch(ledger, invocation) {
            Ok(payload) => Response::success(payload),
            Err(e) => {
                warn!(status = e.status(), "invoke failed: {}", e);
                Response::from_error(&e)
            }
        }
    }

    fn dispatch<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        invocation: &Invocation,
    ) -> Result<Option<Vec<u8>>> {
        let args = invocation.args.as_slice();
        match invocation.function.as_str() {
            FN_CAST => {
                let [question, answer] = args else {
                    return Err(invalid_argument!(
                        "cast expects 2 arguments (question, answer), got {}",
                        args.len()
                    ));
                };
                let certificate = ledger.caller_certificate()?;
                self.cast(ledger, question, answer, &certificate)?;
                Ok(None)
            }
            FN_QUERY => {
                let votes = self.query(ledger, args)?;
                Ok(Some(serde_json::to_vec(&votes)?))
            }
            FN_TALLY => {
                let tally = self.tally(ledger, args)?;
                Ok(Some(serde_json::to_vec(&tally)?))
            }
            other => Err(Error::invalid_function(other)),
        }
    }

    /// Record `answer` for the certificate holder on `question`
    ///
    /// Writes exactly once on success and never on failure.
    pub fn cast<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        question: &str,
        answer: &str,
        certificate: &[u8],
    ) -> Result<()> {
        let identity = extract_identity(certificate)?;

        if let Some(gate) = &self.gate {
            gate.authorize(ledger, &identity)?;
        }

        let vote_key = VoteKey::for_identity(question, &identity);
        let key = self.votes.encode(&vote_key.parts())?;

        if self.config.recast_policy == RecastPolicy::Reject
            && ledger.get_state(&key)?.is_some()
        {
            return Err(Error::already_voted(format!(
                "{} of {} has already answered '{}'",
                identity.user, identity.organization, question
            )));
        }

        ledger.put_state(&key, answer.as_bytes())?;
        info!(
            question,
            organization = %identity.organization,
            user = %identity.user,
            "Ballot recorded"
        );
        Ok(())
    }

    /// Ballots on `filters[0]`, optionally narrowed to organization `filters[1]`
    ///
    /// Results come back in key order. Any iteration or decode failure discards
    /// everything read so far.
    pub fn query<L: Ledger + ?Sized>(&self, ledger: &L, filters: &[String]) -> Result<Vec<Vote>> {
        let range = self.scan_range(filters)?;
        debug!(start = %hex::encode(&range.start), "Scanning ballots");

        let mut scan = ScanGuard::open(ledger, &range)?;
        let mut votes = Vec::new();
        for entry in scan.by_ref() {
            let (key, value) = entry?;
            votes.push(self.decode_vote(&key, value)?);
        }
        scan.finish()?;

        debug!(count = votes.len(), "Query complete");
        Ok(votes)
    }

    /// Per-answer counts over the same range `query` reads
    pub fn tally<L: Ledger + ?Sized>(&self, ledger: &L, filters: &[String]) -> Result<Tally> {
        let votes = self.query(ledger, filters)?;
        // query has already checked that a question is present
        let question = filters.first().cloned().unwrap_or_default();
        Ok(Tally::from_votes(question, filters.get(1).cloned(), &votes))
    }

    fn scan_range(&self, filters: &[String]) -> Result<KeyRange> {
        match filters.len() {
            0 => Err(invalid_argument!("query expects a question")),
            n if n > MAX_QUERY_FILTERS => Err(invalid_argument!(
                "Incorrect number of arguments: expected at most {}, got {}",
                MAX_QUERY_FILTERS,
                n
            )),
            _ => self.votes.scan_prefix(filters),
        }
    }

    fn decode_vote(&self, key: &[u8], value: Vec<u8>) -> Result<Vote> {
        let [question, organization, user] = self.votes.decode_fixed::<VOTE_KEY_ARITY>(key)?;
        let answer = String::from_utf8(value).map_err(|e| {
            Error::value_decode(format!("answer for {question}/{organization} is not UTF-8: {e}"))
        })?;

        let vote_key = VoteKey::new(question, organization, user);
        Ok(Vote {
            key: vote_key.into(),
            answer,
        })
    }
}
