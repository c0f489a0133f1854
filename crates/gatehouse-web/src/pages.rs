use axum::extract::State;
use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};
use axum::Extension;

use crate::error::AppError;
use crate::middleware::locale::ResolvedLocale;
use crate::state::AppState;

/// HTML shell served for every non-API path. The `lang` attribute carries the
/// locale placeholder, filled in by the locale stage on the way out.
pub async fn app_shell(
    State(state): State<AppState>,
    locale: Option<Extension<ResolvedLocale>>,
    method: Method,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return AppError::NotFound("Not found".to_string()).into_response();
    }
    if let Some(Extension(ResolvedLocale(locale))) = locale {
        tracing::debug!(%locale, "serving app shell");
    }

    let lang = &state.config.settings.locale.placeholder;
    Html(format!(
        "<!doctype html>\n\
         <html lang=\"{lang}\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Gatehouse</title>\n\
         </head>\n\
         <body>\n\
         <div id=\"app\"></div>\n\
         </body>\n\
         </html>\n"
    ))
    .into_response()
}
