use super::{
    flash::FlashMessage, login_url, pending, redirect, redirect_with, render, render_with,
    OutgoingChoice, OutgoingQuestion,
};
use crate::{
    auth::{client_ip, CurrentUser},
    db::{
        choice::{ChoiceId, ChoiceTally},
        question::{InternalQuestion, QuestionId},
        user::InternalUser,
    },
    error::{PollError, ServerError},
    ledger::{Ballot, VoteError, VoteLedger},
    lifecycle,
    store::PollStore,
};
use actix_web::{cookie::Cookie, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

#[derive(Serialize)]
struct IndexContext {
    latest_question_list: Vec<OutgoingQuestion>,
}

#[derive(Serialize)]
struct DetailContext {
    question: OutgoingQuestion,
    choices: Vec<OutgoingChoice>,
    voted_choice: Option<ChoiceId>,
}

#[derive(Serialize)]
struct ResultsContext {
    question: OutgoingQuestion,
    choices: Vec<ChoiceTally>,
    voted_choice: Option<ChoiceId>,
}

#[derive(Debug, Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    pub choice: Option<String>,
}

pub fn detail_url(question: QuestionId) -> String {
    format!("/{}/", question)
}

pub fn results_url(question: QuestionId) -> String {
    format!("/{}/results/", question)
}

pub fn vote_url(question: QuestionId) -> String {
    format!("/{}/vote", question)
}

/// Unparseable ids, unknown ids and questions not published yet all look the same.
async fn published_question(
    store: &dyn PollStore,
    raw_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<InternalQuestion>, Report> {
    let question_id = match raw_id.parse::<QuestionId>() {
        Ok(question_id) => question_id,
        Err(_) => return Ok(None),
    };
    let question = store.question(question_id).await?;
    Ok(question.filter(|question| lifecycle::is_published(question, now)))
}

fn question_not_found(req: &HttpRequest, raw_id: &str) -> HttpResponse {
    error!(
        "IP {} tried to access non-existent question (ID: {})",
        client_ip(req),
        raw_id
    );
    let message = PollError::NotFound(raw_id.to_owned()).to_string();
    redirect(req, "/", vec![FlashMessage::error(message)])
}

fn login_redirect(question: QuestionId, cookies: Vec<Cookie<'static>>) -> HttpResponse {
    let mut builder = HttpResponse::Found();
    builder.insert_header((
        actix_web::http::header::LOCATION,
        login_url(&vote_url(question)),
    ));
    for cookie in cookies {
        builder.cookie(cookie);
    }
    builder.finish()
}

pub async fn index(req: HttpRequest, store: web::Data<dyn PollStore>) -> Result<HttpResponse, ServerError> {
    let now = Utc::now();
    let questions = store.published_questions(now).await?;
    let context = IndexContext {
        latest_question_list: questions
            .iter()
            .map(|question| OutgoingQuestion::new(question, now))
            .collect(),
    };
    Ok(render(&req, "index", context, Vec::new()))
}

async fn render_detail(
    req: &HttpRequest,
    store: &dyn PollStore,
    question: &InternalQuestion,
    user: Option<&InternalUser>,
    now: DateTime<Utc>,
    messages: Vec<FlashMessage>,
    cookies: Vec<Cookie<'static>>,
) -> Result<HttpResponse, ServerError> {
    let choices = store.choices(question.id).await?;
    let voted_choice = VoteLedger::new(store).voted_choice(user, question).await?;
    let context = DetailContext {
        question: OutgoingQuestion::new(question, now),
        choices: choices.into_iter().map(OutgoingChoice::from).collect(),
        voted_choice,
    };
    Ok(render_with(req, "detail", context, messages, cookies))
}

pub async fn detail(
    req: HttpRequest,
    path: web::Path<String>,
    store: web::Data<dyn PollStore>,
    user: CurrentUser,
) -> Result<HttpResponse, ServerError> {
    let now = Utc::now();
    let raw_id = path.into_inner();
    let question = match published_question(store.get_ref(), &raw_id, now).await? {
        Some(question) => question,
        None => return Ok(question_not_found(&req, &raw_id)),
    };
    if !lifecycle::can_vote(&question, now) {
        debug!("Question {} is closed, showing results", question.id);
        return Ok(redirect(&req, &results_url(question.id), Vec::new()));
    }
    render_detail(&req, store.get_ref(), &question, user.user(), now, Vec::new(), Vec::new()).await
}

pub async fn results(
    req: HttpRequest,
    path: web::Path<String>,
    store: web::Data<dyn PollStore>,
    user: CurrentUser,
) -> Result<HttpResponse, ServerError> {
    let now = Utc::now();
    let raw_id = path.into_inner();
    let question = match published_question(store.get_ref(), &raw_id, now).await? {
        Some(question) => question,
        None => return Ok(question_not_found(&req, &raw_id)),
    };
    let ledger = VoteLedger::new(store.get_ref());
    let context = ResultsContext {
        question: OutgoingQuestion::new(&question, now),
        choices: ledger.tally(&question).await?,
        voted_choice: ledger.voted_choice(user.user(), &question).await?,
    };
    Ok(render(&req, "results", context, Vec::new()))
}

/// Casts the vote and answers the way the vote form expects: a redirect to the
/// results on success, the detail page with the reason otherwise.
#[instrument(skip_all, fields(question = %question.id))]
async fn cast(
    req: &HttpRequest,
    store: &dyn PollStore,
    user: &InternalUser,
    question: &InternalQuestion,
    choice: Option<ChoiceId>,
    now: DateTime<Utc>,
    cookies: Vec<Cookie<'static>>,
) -> Result<HttpResponse, ServerError> {
    let failure = match choice {
        None => PollError::MissingSelection,
        Some(choice) => match VoteLedger::new(store).cast_vote(user, question, choice, now).await {
            Ok(ballot) => {
                let text = match &ballot {
                    Ballot::Created { choice } => format!("You voted for '{}'", choice.choice_text),
                    Ballot::Updated { choice, .. } => {
                        format!("Your vote was updated to '{}'", choice.choice_text)
                    }
                };
                return Ok(redirect_with(
                    req,
                    &results_url(question.id),
                    vec![FlashMessage::success(text)],
                    cookies,
                ));
            }
            Err(VoteError::ChoiceNotFound(_)) => PollError::MissingSelection,
            Err(VoteError::PollClosed(_)) => PollError::PollClosed,
            Err(VoteError::Store(report)) => return Err(report.into()),
        },
    };
    render_detail(
        req,
        store,
        question,
        Some(user),
        now,
        vec![FlashMessage::error(failure.to_string())],
        cookies,
    )
    .await
}

pub async fn vote(
    req: HttpRequest,
    path: web::Path<String>,
    form: Option<web::Form<VoteForm>>,
    store: web::Data<dyn PollStore>,
    user: CurrentUser,
) -> Result<HttpResponse, ServerError> {
    let now = Utc::now();
    let raw_id = path.into_inner();
    let question = match published_question(store.get_ref(), &raw_id, now).await? {
        Some(question) => question,
        None => return Ok(question_not_found(&req, &raw_id)),
    };
    // A body that isn't a vote form counts as no selection.
    let choice = form
        .and_then(|form| form.into_inner().choice)
        .and_then(|choice| choice.parse::<ChoiceId>().ok());

    let current = match user.user() {
        Some(current) => current,
        None => {
            // Remembered per client so it can be replayed after login. Any
            // older selection is forgotten when this one doesn't count.
            let belongs = match choice {
                Some(choice) => store
                    .choice(choice)
                    .await?
                    .map_or(false, |found| found.question_id == question.id),
                None => false,
            };
            let cookie = match choice {
                Some(choice) if belongs => pending::cookie(question.id, choice),
                _ => pending::removal(),
            };
            return Ok(login_redirect(question.id, vec![cookie]));
        }
    };
    // The user just chose for themselves; an earlier pending selection is void.
    cast(&req, store.get_ref(), current, &question, choice, now, vec![pending::removal()]).await
}

/// Where login sends an anonymous voter back to. Replays the selection they
/// made before logging in, if it was for this question.
pub async fn resume_vote(
    req: HttpRequest,
    path: web::Path<String>,
    store: web::Data<dyn PollStore>,
    user: CurrentUser,
) -> Result<HttpResponse, ServerError> {
    let now = Utc::now();
    let raw_id = path.into_inner();
    let question = match published_question(store.get_ref(), &raw_id, now).await? {
        Some(question) => question,
        None => return Ok(question_not_found(&req, &raw_id)),
    };
    let current = match user.user() {
        Some(current) => current,
        None => return Ok(login_redirect(question.id, Vec::new())),
    };
    match pending::take(&req, question.id) {
        Some(choice) => {
            debug!("Replaying pending vote for choice {}", choice);
            cast(
                &req,
                store.get_ref(),
                current,
                &question,
                Some(choice),
                now,
                vec![pending::removal()],
            )
            .await
        }
        None => Ok(redirect(&req, &detail_url(question.id), Vec::new())),
    }
}
