//! One vote per user per question.
//!
//! Vote totals are never stored: [`VoteLedger::tally`] counts vote rows per
//! choice on every read.

use crate::{
    db::{
        choice::{ChoiceId, ChoiceTally, InternalChoice},
        question::{InternalQuestion, QuestionId},
        user::InternalUser,
        vote::RecordedVote,
    },
    lifecycle,
    store::PollStore,
};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Report;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("choice {0} does not belong to the question")]
    ChoiceNotFound(ChoiceId),
    #[error("question {0} is closed for voting")]
    PollClosed(QuestionId),
    #[error("vote store failed: {0}")]
    Store(Report),
}

impl From<Report> for VoteError {
    fn from(report: Report) -> Self {
        VoteError::Store(report)
    }
}

/// What a successful [`VoteLedger::cast_vote`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ballot {
    Created {
        choice: InternalChoice,
    },
    Updated {
        /// `None` only if the previous choice vanished in between.
        previous: Option<InternalChoice>,
        choice: InternalChoice,
    },
}

pub struct VoteLedger<'a> {
    store: &'a dyn PollStore,
}

impl<'a> VoteLedger<'a> {
    pub fn new(store: &'a dyn PollStore) -> Self {
        Self { store }
    }

    /// Records `user`'s vote for `choice`, moving their existing vote on the
    /// question if there is one. Nothing is written when the choice belongs to
    /// another question or the poll isn't open at `now`.
    #[instrument(skip_all, fields(question = %question.id, user = %user.username))]
    pub async fn cast_vote(
        &self,
        user: &InternalUser,
        question: &InternalQuestion,
        choice_id: ChoiceId,
        now: DateTime<Utc>,
    ) -> Result<Ballot, VoteError> {
        let choice = match self.store.choice(choice_id).await? {
            Some(choice) if choice.question_id == question.id => choice,
            _ => return Err(VoteError::ChoiceNotFound(choice_id)),
        };
        if !lifecycle::can_vote(question, now) {
            warn!("Vote attempted outside the voting window");
            return Err(VoteError::PollClosed(question.id));
        }

        let recorded = self.store.record_vote(user.id, question.id, choice.id).await?;
        debug!(vote = ?recorded.vote().id, "Vote recorded");
        match recorded {
            RecordedVote::Created(_) => {
                info!(
                    "User {} voted for {} (Question: {})",
                    user.username, choice.choice_text, question.question_text
                );
                Ok(Ballot::Created { choice })
            }
            RecordedVote::Updated { previous, .. } => {
                let previous = self.store.choice(previous).await?;
                info!(
                    "User {} updated vote from {} to {} (Question: {})",
                    user.username,
                    previous.as_ref().map_or("<removed choice>", |c| c.choice_text.as_str()),
                    choice.choice_text,
                    question.question_text
                );
                Ok(Ballot::Updated { previous, choice })
            }
        }
    }

    pub async fn tally(&self, question: &InternalQuestion) -> Result<Vec<ChoiceTally>, Report> {
        self.store.tally(question.id).await
    }

    /// The choice `user` currently has for `question`. Anonymous users have none.
    pub async fn voted_choice(
        &self,
        user: Option<&InternalUser>,
        question: &InternalQuestion,
    ) -> Result<Option<ChoiceId>, Report> {
        let Some(user) = user else {
            return Ok(None);
        };
        let vote = self.store.vote_for(user.id, question.id).await?;
        Ok(vote.map(|vote| vote.choice_id))
    }
}
