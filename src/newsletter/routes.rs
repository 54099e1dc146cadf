use actix_web::{
    error::{InternalError, UrlencodedError},
    get,
    http::header,
    post, web, Error, HttpRequest, HttpResponse, Responder,
};

use super::client::{MailingListClient, SignupForm, SubscribeOutcome};

const SIGNUP_PAGE: &str = include_str!("../../static/signup.html");
const SUCCESS_PAGE: &str = include_str!("../../static/success.html");
const FAILURE_PAGE: &str = include_str!("../../static/failure.html");

fn html(page: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(header::ContentType::html())
        .body(page)
}

#[get("/")]
pub async fn signup_form() -> impl Responder {
    html(SIGNUP_PAGE)
}

/// Relays the submitted form and answers with the success or failure page.
#[post("/")]
pub async fn subscribe(
    client: web::Data<MailingListClient>,
    form: web::Form<SignupForm>,
) -> impl Responder {
    match client.subscribe(&form).await {
        SubscribeOutcome::Subscribed => html(SUCCESS_PAGE),
        SubscribeOutcome::Rejected(status) => {
            log::warn!("mailing list rejected signup with status {}", status);
            html(FAILURE_PAGE)
        }
        SubscribeOutcome::Unreachable(err) => {
            log::error!("mailing list unreachable: {}", err);
            html(FAILURE_PAGE)
        }
    }
}

/// "Try again" on the failure page.
#[post("/failure")]
pub async fn retry() -> impl Responder {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/"))
        .finish()
}

/// A submission that does not parse gets the failure page like any other failed signup.
fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> Error {
    log::warn!("unreadable signup form: {}", err);
    InternalError::from_response(err, html(FAILURE_PAGE)).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(signup_form)
        .service(subscribe)
        .service(retry);
}
