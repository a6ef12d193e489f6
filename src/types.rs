//! # Core Types for the Ballot Ledger
//!
//! Records that flow between the identity extractor, the key scheme and the
//! vote store. None of them is persisted whole: a [`VoteKey`] lives only as the
//! components of a composite ledger key and the answer is the raw value stored
//! under it.
//!
//! ## Usage Examples
//!
//! ```rust
//! use ballot_ledger::types::{Identity, Tally, Vote, VoteKey};
//!
//! let voter = Identity::new("alice", "OrgA");
//! let key = VoteKey::for_identity("Q1", &voter);
//! assert_eq!(key.parts(), ["Q1", "OrgA", "alice"]);
//!
//! let votes = vec![Vote::new("Q1", "OrgA", "yes"), Vote::new("Q1", "OrgB", "no")];
//! let tally = Tally::from_votes("Q1", None, &votes);
//! assert_eq!(tally.total, 2);
//! assert_eq!(tally.count("yes"), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who submitted a transaction, as read from their certificate
///
/// Derived on every request; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Subject common name
    pub user: String,

    /// Issuer organization with its sub-unit qualifier stripped
    pub organization: String,
}

impl Identity {
    pub fn new(user: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            organization: organization.into(),
        }
    }
}

/// The ballot slot `(question, organization, user)`
///
/// At most one answer is stored per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteKey {
    pub question: String,
    pub organization: String,
    pub user: String,
}

impl VoteKey {
    pub fn new(
        question: impl Into<String>,
        organization: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            organization: organization.into(),
            user: user.into(),
        }
    }

    /// Ballot slot of `identity` on `question`
    pub fn for_identity(question: impl Into<String>, identity: &Identity) -> Self {
        Self::new(question, &identity.organization, &identity.user)
    }

    /// Key components in index order
    pub fn parts(&self) -> [&str; 3] {
        [&self.question, &self.organization, &self.user]
    }
}

/// Published form of a ballot key; the user is left out of query results
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicVoteKey {
    pub question: String,
    pub organization: String,
}

impl From<VoteKey> for PublicVoteKey {
    fn from(key: VoteKey) -> Self {
        Self {
            question: key.question,
            organization: key.organization,
        }
    }
}

/// One ballot as returned by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub key: PublicVoteKey,
    pub answer: String,
}

impl Vote {
    pub fn new(
        question: impl Into<String>,
        organization: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            key: PublicVoteKey {
                question: question.into(),
                organization: organization.into(),
            },
            answer: answer.into(),
        }
    }
}

/// Per-answer counts for a question, optionally narrowed to one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub organization: Option<String>,
    pub total: u64,
    /// Answer → number of ballots, ordered by answer
    pub answers: BTreeMap<String, u64>,
}

impl Tally {
    /// Aggregate decoded votes
    pub fn from_votes(
        question: impl Into<String>,
        organization: Option<String>,
        votes: &[Vote],
    ) -> Self {
        let mut answers = BTreeMap::new();
        for vote in votes {
            *answers.entry(vote.answer.clone()).or_insert(0) += 1;
        }

        Self {
            question: question.into(),
            organization,
            total: votes.len() as u64,
            answers,
        }
    }

    /// Ballots cast for `answer`
    pub fn count(&self, answer: &str) -> u64 {
        self.answers.get(answer).copied().unwrap_or(0)
    }
}
