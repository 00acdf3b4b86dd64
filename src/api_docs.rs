use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::books::list_books,
        api::books::get_book,
        api::categories::list_categories,
        api::webhooks::stripe_webhook,
    ),
    tags(
        (name = "booknest", description = "BookNest bookstore API")
    )
)]
pub struct ApiDoc;
