use crate::db::{
    choice::ChoiceId,
    question::QuestionId,
    user::UserId,
    vote::{InternalVote, RecordedVote, VoteId},
};
use std::collections::HashMap;
use tracing::debug;

/// Votes keyed by `(user, question)`, which is what keeps them unique.
#[derive(Default)]
pub struct VoteManager {
    votes: HashMap<(UserId, QuestionId), InternalVote>,
}

impl VoteManager {
    pub fn find(&self, user_id: UserId, question_id: QuestionId) -> Option<InternalVote> {
        self.votes.get(&(user_id, question_id)).cloned()
    }

    pub fn record(
        &mut self,
        user_id: UserId,
        question_id: QuestionId,
        choice_id: ChoiceId,
    ) -> RecordedVote {
        match self.votes.get_mut(&(user_id, question_id)) {
            Some(vote) => {
                debug!("Moving vote {id:?} to choice {choice}", id = vote.id, choice = choice_id);
                let previous = vote.choice_id;
                vote.choice_id = choice_id;
                RecordedVote::Updated {
                    vote: vote.clone(),
                    previous,
                }
            }
            None => {
                debug!("Inserting vote for choice {choice}", choice = choice_id);
                let vote = InternalVote {
                    id: VoteId::new(),
                    choice_id,
                    question_id,
                    user_id,
                };
                self.votes.insert((user_id, question_id), vote.clone());
                RecordedVote::Created(vote)
            }
        }
    }

    pub fn count_for_choice(&self, choice_id: ChoiceId) -> i64 {
        self.votes
            .values()
            .filter(|vote| vote.choice_id == choice_id)
            .count() as i64
    }

    pub fn count_for_user(&self, user_id: UserId, question_id: QuestionId) -> i64 {
        self.votes
            .values()
            .filter(|vote| vote.user_id == user_id && vote.question_id == question_id)
            .count() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_vote_moves_the_first() {
        let mut manager = VoteManager::default();
        let user = UserId::new();
        let question = QuestionId::new();
        let (first, second) = (ChoiceId::new(), ChoiceId::new());

        let created = manager.record(user, question, first);
        assert!(matches!(created, RecordedVote::Created(_)));

        let updated = manager.record(user, question, second);
        assert_eq!(
            updated,
            RecordedVote::Updated {
                vote: InternalVote {
                    id: created.vote().id,
                    choice_id: second,
                    question_id: question,
                    user_id: user,
                },
                previous: first,
            }
        );
        assert_eq!(manager.count_for_user(user, question), 1);
        assert_eq!(manager.count_for_choice(first), 0);
        assert_eq!(manager.count_for_choice(second), 1);
    }

    #[test]
    fn votes_are_per_question() {
        let mut manager = VoteManager::default();
        let user = UserId::new();
        let choice = ChoiceId::new();
        manager.record(user, QuestionId::new(), choice);
        manager.record(user, QuestionId::new(), choice);
        assert_eq!(manager.count_for_choice(choice), 2);
    }
}
