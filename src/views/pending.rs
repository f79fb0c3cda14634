//! Selection made by an anonymous voter, kept in their own cookie until they
//! come back from the login page.

use crate::db::{choice::ChoiceId, question::QuestionId};
use actix_web::{cookie::Cookie, HttpRequest};

pub const PENDING_VOTE_COOKIE: &str = "pending_vote";

pub fn cookie(question: QuestionId, choice: ChoiceId) -> Cookie<'static> {
    Cookie::build(PENDING_VOTE_COOKIE, format!("{}:{}", question, choice))
        .path("/")
        .http_only(true)
        .finish()
}

pub fn removal() -> Cookie<'static> {
    let mut cookie = Cookie::build(PENDING_VOTE_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// The pending choice for `question`, ignoring selections made on other questions.
pub fn take(req: &HttpRequest, question: QuestionId) -> Option<ChoiceId> {
    let cookie = req.cookie(PENDING_VOTE_COOKIE)?;
    let (question_id, choice_id) = cookie.value().split_once(':')?;
    if question_id.parse::<QuestionId>().ok()? != question {
        return None;
    }
    choice_id.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn only_answers_for_its_question() {
        let (question, choice) = (QuestionId::new(), ChoiceId::new());
        let req = TestRequest::default()
            .cookie(cookie(question, choice))
            .to_http_request();
        assert_eq!(take(&req, question), Some(choice));
        assert_eq!(take(&req, QuestionId::new()), None);
    }
}
