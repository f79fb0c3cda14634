extern crate polls_server;
mod integration_db;

use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use insta::assert_json_snapshot;
use integration_db::IntegrationTestDb;
use polls_server::{
    auth::hash_password,
    config::Config,
    db::{
        choice::ChoiceId,
        question::QuestionId,
        user::{InternalUser, NewUser},
        vote::RecordedVote,
        PgStore,
    },
    ledger::{Ballot, VoteError, VoteLedger},
    server,
    store::PollStore,
};
use serde_json::Value;
use std::sync::Arc;

const LANGUAGE_QUESTION: &str = "6f1c2a4e-0b1d-4c43-9f55-3f0a1d2b7c01";
const TABS_QUESTION: &str = "6f1c2a4e-0b1d-4c43-9f55-3f0a1d2b7c02";
const FUTURE_QUESTION: &str = "6f1c2a4e-0b1d-4c43-9f55-3f0a1d2b7c03";
const RUST: &str = "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f01";
const OTHER: &str = "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f03";
const TABS: &str = "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f04";

fn question_id(id: &str) -> QuestionId {
    id.parse().unwrap()
}

fn choice_id(id: &str) -> ChoiceId {
    id.parse().unwrap()
}

async fn create_user(store: &PgStore, username: &str) -> InternalUser {
    store
        .add_user(NewUser {
            username: username.to_owned(),
            email: Some(format!("{}@example.com", username)),
            password_hash: hash_password("hunter2").unwrap(),
        })
        .await
        .unwrap()
        .unwrap()
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_published_questions() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());

    let published: Vec<QuestionId> = store
        .published_questions(Utc::now())
        .await
        .unwrap()
        .into_iter()
        .map(|question| question.id)
        .collect();
    assert_eq!(published.len(), 2);
    assert!(published.contains(&question_id(LANGUAGE_QUESTION)));
    assert!(published.contains(&question_id(TABS_QUESTION)));
    assert!(!published.contains(&question_id(FUTURE_QUESTION)));

    let newest = store
        .add_question("Brand new?", Utc::now() - Duration::minutes(1), None)
        .await
        .unwrap();
    let published = store.published_questions(Utc::now()).await.unwrap();
    assert_eq!(published[0].id, newest.id);
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_choices_in_creation_order() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());

    let question = question_id(LANGUAGE_QUESTION);
    let texts: Vec<String> = store
        .choices(question)
        .await
        .unwrap()
        .into_iter()
        .map(|choice| choice.choice_text)
        .collect();
    assert_eq!(texts, vec!["Rust", "Python", "Other"]);

    let added = store.add_choice(question, "Zig").await.unwrap();
    let tally = store.tally(question).await.unwrap();
    assert_eq!(tally.last().unwrap().id, added.id);
    assert!(tally.iter().all(|choice| choice.votes == 0));
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_one_user_one_vote() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "voter").await;
    let question = store
        .question(question_id(LANGUAGE_QUESTION))
        .await
        .unwrap()
        .unwrap();
    let ledger = VoteLedger::new(&store);

    let ballot = ledger
        .cast_vote(&user, &question, choice_id(RUST), Utc::now())
        .await
        .unwrap();
    assert!(matches!(ballot, Ballot::Created { .. }));

    let ballot = ledger
        .cast_vote(&user, &question, choice_id(OTHER), Utc::now())
        .await
        .unwrap();
    match ballot {
        Ballot::Updated { previous, choice } => {
            assert_eq!(previous.unwrap().id, choice_id(RUST));
            assert_eq!(choice.id, choice_id(OTHER));
        }
        Ballot::Created { .. } => panic!("second vote should update the first"),
    }

    let votes: Vec<i64> = ledger
        .tally(&question)
        .await
        .unwrap()
        .into_iter()
        .map(|choice| choice.votes)
        .collect();
    assert_eq!(votes, vec![0, 0, 1]);
    assert_eq!(store.vote_count(user.id, question.id).await.unwrap(), 1);
    assert_eq!(
        ledger.voted_choice(Some(&user), &question).await.unwrap(),
        Some(choice_id(OTHER))
    );
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_simultaneous_votes_keep_one_row() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "eager").await;
    let question = question_id(LANGUAGE_QUESTION);

    let (first, second) = futures::join!(
        store.record_vote(user.id, question, choice_id(RUST)),
        store.record_vote(user.id, question, choice_id(OTHER)),
    );
    let (created, updated) = match (first.unwrap(), second.unwrap()) {
        (created @ RecordedVote::Created(_), updated @ RecordedVote::Updated { .. }) => (created, updated),
        (updated @ RecordedVote::Updated { .. }, created @ RecordedVote::Created(_)) => (created, updated),
        other => panic!("expected one created and one updated vote, got {:?}", other),
    };
    // Whichever came second reports the choice it replaced
    match updated {
        RecordedVote::Updated { vote, previous } => {
            assert_eq!(vote.id, created.vote().id);
            assert_eq!(previous, created.vote().choice_id);
        }
        RecordedVote::Created(_) => unreachable!(),
    }
    assert_eq!(store.vote_count(user.id, question).await.unwrap(), 1);
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_closed_poll_is_not_written() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "latecomer").await;
    let question = store
        .question(question_id(TABS_QUESTION))
        .await
        .unwrap()
        .unwrap();

    let result = VoteLedger::new(&store)
        .cast_vote(&user, &question, choice_id(TABS), Utc::now())
        .await;
    assert!(matches!(result, Err(VoteError::PollClosed(id)) if id == question.id));
    assert_eq!(store.vote_count(user.id, question.id).await.unwrap(), 0);
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_end_date_closes_poll() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "slow").await;
    let question = question_id(LANGUAGE_QUESTION);

    let closed = store
        .set_end_date(question, Some(Utc::now() - Duration::seconds(1)))
        .await
        .unwrap()
        .unwrap();
    let result = VoteLedger::new(&store)
        .cast_vote(&user, &closed, choice_id(RUST), Utc::now())
        .await;
    assert!(matches!(result, Err(VoteError::PollClosed(_))));

    let reopened = store.set_end_date(question, None).await.unwrap().unwrap();
    assert_eq!(reopened.end_date, None);
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_vote_must_match_question() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "confused").await;

    // Tabs belongs to another question; the composite key refuses the row
    let result = store
        .record_vote(user.id, question_id(LANGUAGE_QUESTION), choice_id(TABS))
        .await;
    assert!(result.is_err());
    assert_eq!(
        store
            .vote_count(user.id, question_id(LANGUAGE_QUESTION))
            .await
            .unwrap(),
        0
    );
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_username_taken() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "unique").await;

    let duplicate = store
        .add_user(NewUser {
            username: "unique".to_owned(),
            email: None,
            password_hash: hash_password("other").unwrap(),
        })
        .await
        .unwrap();
    assert!(duplicate.is_none());
    assert_eq!(
        store.user_by_username("unique").await.unwrap().unwrap().id,
        user.id
    );
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_sessions() {
    let test_db = IntegrationTestDb::new().await;
    let store = PgStore::start(test_db.pool());
    let user = create_user(&store, "sessionuser").await;

    let session = store.save_session(user.id).await.unwrap();
    let found = store.session(session.id).await.unwrap().unwrap();
    assert_eq!(found.user_id, user.id);
    assert_eq!(
        store.user_by_id(found.user_id).await.unwrap().unwrap().username,
        "sessionuser"
    );

    store.delete_session(session.id).await.unwrap();
    assert!(store.session(session.id).await.unwrap().is_none());
}

#[actix_rt::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_results_page() {
    let test_db = IntegrationTestDb::new().await;
    let store = Arc::new(PgStore::start(test_db.pool()));
    let app = test::init_service(App::new().configure(server::configure(
        web::Data::from(store.clone() as Arc<dyn PollStore>),
        web::Data::new(Config::default()),
    )))
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/{}/results/", LANGUAGE_QUESTION))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    insta::with_settings!({ sort_maps => true }, {
        assert_json_snapshot!(body, {
            ".question.pub_date" => "[date]",
        }, @r###"
        {
          "choices": [
            {
              "choice_text": "Rust",
              "id": "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f01",
              "votes": 0
            },
            {
              "choice_text": "Python",
              "id": "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f02",
              "votes": 0
            },
            {
              "choice_text": "Other",
              "id": "0a7e9d3b-5c2f-4e61-8d4a-1b2c3d4e5f03",
              "votes": 0
            }
          ],
          "messages": [],
          "page": "results",
          "question": {
            "can_vote": true,
            "end_date": null,
            "id": "6f1c2a4e-0b1d-4c43-9f55-3f0a1d2b7c01",
            "pub_date": "[date]",
            "question_text": "What is your favourite language?",
            "was_published_recently": false
          },
          "voted_choice": null
        }
        "###);
    });
}
