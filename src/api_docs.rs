use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::books::list_books,
        api::books::get_book,
        api::borrowings::borrow_book,
        api::borrowings::return_book,
        api::stats::dashboard_stats,
        // Add other endpoints here as we document them
    ),
    components(
        schemas(
            // We will need to derive ToSchema for our models
            // crate::models::book::Book,
        )
    ),
    tags(
        (name = "circdesk", description = "Circulation desk API")
    )
)]
pub struct ApiDoc;
