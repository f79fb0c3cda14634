use crate::db::{
    choice::{ChoiceId, InternalChoice},
    question::{InternalQuestion, QuestionId},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Default)]
pub struct QuestionManager {
    questions: HashMap<QuestionId, InternalQuestion>,
    // Creation order doubles as display order.
    choices: Vec<InternalChoice>,
}

impl QuestionManager {
    pub fn find_by_id(&self, question_id: QuestionId) -> Option<InternalQuestion> {
        self.questions.get(&question_id).cloned()
    }

    pub fn published(&self, now: DateTime<Utc>) -> Vec<InternalQuestion> {
        let mut published: Vec<InternalQuestion> = self
            .questions
            .values()
            .filter(|question| question.pub_date <= now)
            .cloned()
            .collect();
        published.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        published
    }

    pub fn insert(&mut self, question: InternalQuestion) {
        self.questions.insert(question.id, question);
    }

    pub fn set_end_date(
        &mut self,
        question_id: QuestionId,
        end_date: Option<DateTime<Utc>>,
    ) -> Option<InternalQuestion> {
        let question = self.questions.get_mut(&question_id)?;
        question.end_date = end_date;
        Some(question.clone())
    }

    pub fn choices_for(&self, question_id: QuestionId) -> Vec<InternalChoice> {
        self.choices
            .iter()
            .filter(|choice| choice.question_id == question_id)
            .cloned()
            .collect()
    }

    pub fn find_choice(&self, choice_id: ChoiceId) -> Option<InternalChoice> {
        self.choices.iter().find(|choice| choice.id == choice_id).cloned()
    }

    /// Returns `None` if the question doesn't exist.
    pub fn insert_choice(&mut self, choice: InternalChoice) -> Option<InternalChoice> {
        if !self.questions.contains_key(&choice.question_id) {
            return None;
        }
        self.choices.push(choice.clone());
        Some(choice)
    }
}
