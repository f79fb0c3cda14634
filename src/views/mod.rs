//! Request handlers. Pages are answered with their context as JSON; turning
//! that into HTML is left to whatever sits in front of the server.

pub mod accounts;
pub mod flash;
pub mod pending;
pub mod polls;

use crate::{
    db::{
        choice::{ChoiceId, InternalChoice},
        question::{InternalQuestion, QuestionId},
    },
    lifecycle,
};
use actix_web::{cookie::Cookie, http::header, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use flash::FlashMessage;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct OutgoingQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub can_vote: bool,
    pub was_published_recently: bool,
}

impl OutgoingQuestion {
    pub fn new(question: &InternalQuestion, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text.clone(),
            pub_date: question.pub_date,
            end_date: question.end_date,
            can_vote: lifecycle::can_vote(question, now),
            was_published_recently: lifecycle::was_published_recently(question, now),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct OutgoingChoice {
    pub id: ChoiceId,
    pub choice_text: String,
}

impl From<InternalChoice> for OutgoingChoice {
    fn from(choice: InternalChoice) -> Self {
        Self {
            id: choice.id,
            choice_text: choice.choice_text,
        }
    }
}

#[derive(Serialize)]
struct Page<'a, T> {
    page: &'a str,
    #[serde(flatten)]
    context: T,
    messages: Vec<FlashMessage>,
}

/// 200 with the page context, consuming the flash messages the request carried.
pub(crate) fn render<T: Serialize>(
    req: &HttpRequest,
    page: &str,
    context: T,
    messages: Vec<FlashMessage>,
) -> HttpResponse {
    render_with(req, page, context, messages, Vec::new())
}

pub(crate) fn render_with<T: Serialize>(
    req: &HttpRequest,
    page: &str,
    context: T,
    messages: Vec<FlashMessage>,
    cookies: Vec<Cookie<'static>>,
) -> HttpResponse {
    let mut carried = flash::take(req);
    carried.extend(messages);

    let mut builder = HttpResponse::Ok();
    if flash::present(req) {
        builder.cookie(flash::removal());
    }
    for cookie in cookies {
        builder.cookie(cookie);
    }
    builder.json(Page {
        page,
        context,
        messages: carried,
    })
}

/// 302 to `location`. Flash messages not yet shown travel along.
pub(crate) fn redirect(req: &HttpRequest, location: &str, messages: Vec<FlashMessage>) -> HttpResponse {
    redirect_with(req, location, messages, Vec::new())
}

pub(crate) fn redirect_with(
    req: &HttpRequest,
    location: &str,
    messages: Vec<FlashMessage>,
    cookies: Vec<Cookie<'static>>,
) -> HttpResponse {
    let mut carried = flash::take(req);
    carried.extend(messages);

    let mut builder = HttpResponse::Found();
    builder.insert_header((header::LOCATION, location));
    match flash::cookie(&carried) {
        Some(cookie) => {
            builder.cookie(cookie);
        }
        None if flash::present(req) => {
            builder.cookie(flash::removal());
        }
        None => {}
    }
    for cookie in cookies {
        builder.cookie(cookie);
    }
    builder.finish()
}

pub fn login_url(next: &str) -> String {
    format!("/accounts/login/?next={}", next)
}
