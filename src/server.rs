use crate::{
    config::Config,
    store::PollStore,
    views::{accounts, polls},
};
use actix_web::web;

/// Registers the store, the configuration and every route.
///
/// Fixed paths go first; `/{question_id}/` would otherwise swallow `/signup/`.
pub fn configure(
    store: web::Data<dyn PollStore>,
    config: web::Data<Config>,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(store)
            .app_data(config)
            .route("/", web::get().to(polls::index))
            .service(
                web::resource("/accounts/login/")
                    .route(web::get().to(accounts::login_form))
                    .route(web::post().to(accounts::login)),
            )
            .route("/accounts/logout/", web::post().to(accounts::logout))
            .service(
                web::resource("/signup/")
                    .route(web::get().to(accounts::signup_form))
                    .route(web::post().to(accounts::signup)),
            )
            .route("/{question_id}/", web::get().to(polls::detail))
            .route("/{question_id}/results/", web::get().to(polls::results))
            .service(
                web::resource("/{question_id}/vote")
                    .route(web::post().to(polls::vote))
                    .route(web::get().to(polls::resume_vote)),
            );
    }
}
