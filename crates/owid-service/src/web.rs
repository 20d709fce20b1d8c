//! HTTP surface for the OWID services.
//!
//! Four endpoints: HTML registration of the request host as a signer,
//! access-gated key rotation, the public signer document, and signature
//! verification. Handlers are thin wrappers over [`Services`].

use std::sync::Arc;

use axum::extract::{Host, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use owid_core::{Signer, MAX_NAME_LENGTH, MAX_TERMS_URL_LENGTH, MIN_NAME_LENGTH, OWID_VERSION_1};

use crate::error::ServiceError;
use crate::services::Services;

/// Router exposing the OWID endpoints under `/owid`.
pub fn router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/owid/register", get(register_page).post(register_submit))
        .route("/owid/addkeys", get(add_keys))
        .route(
            &format!("/owid/api/v{OWID_VERSION_1}/signer"),
            get(signer_document),
        )
        .route(
            &format!("/owid/api/v{OWID_VERSION_1}/verify"),
            get(verify_owid),
        )
        .with_state(services)
}

#[derive(Deserialize)]
struct RegisterForm {
    name: String,
    #[serde(rename = "termsURL")]
    terms_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddKeysQuery {
    access_key: String,
}

#[derive(Deserialize)]
struct VerifyQuery {
    owid: String,
    data: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
}

async fn register_page(
    State(services): State<Arc<Services>>,
    Host(host): Host,
) -> Result<Html<String>, ServiceError> {
    if services.store().get_signer(&host).await?.is_some() {
        return Err(ServiceError::AlreadyRegistered(host));
    }
    Ok(Html(register_form(&host)))
}

async fn register_submit(
    State(services): State<Arc<Services>>,
    Host(host): Host,
    Form(form): Form<RegisterForm>,
) -> Result<Html<String>, ServiceError> {
    let signer = services
        .register(&host, &form.name, &form.terms_url)
        .await?;
    Ok(Html(register_result(&signer)))
}

async fn add_keys(
    State(services): State<Arc<Services>>,
    Host(host): Host,
    Query(query): Query<AddKeysQuery>,
) -> Result<String, ServiceError> {
    if !services.access().allowed(&query.access_key).await? {
        return Err(ServiceError::AccessDenied);
    }
    services.rotate_keys(&host).await?;
    Ok(format!("New key added for signer '{host}'"))
}

async fn signer_document(
    State(services): State<Arc<Services>>,
    Host(host): Host,
) -> Result<impl IntoResponse, ServiceError> {
    let signer = services.signer_for_host(&host).await?;
    Ok((
        [(header::CACHE_CONTROL, "max-age=60")],
        Json(signer.public_signer()),
    ))
}

async fn verify_owid(
    State(services): State<Arc<Services>>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let valid = services.verify(&query.owid, &query.data).await?;
    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Json(VerifyResponse { valid }),
    ))
}

fn register_form(host: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Register {host}</title></head>
<body>
  <h1>Register '{host}' as an OWID signer</h1>
  <form method="post" action="/owid/register">
    <label>Name ({MIN_NAME_LENGTH} to {MAX_NAME_LENGTH} characters)
      <input name="name" minlength="{MIN_NAME_LENGTH}" maxlength="{MAX_NAME_LENGTH}" required>
    </label>
    <label>Terms URL (up to {MAX_TERMS_URL_LENGTH} characters)
      <input name="termsURL" type="url" maxlength="{MAX_TERMS_URL_LENGTH}" required>
    </label>
    <button type="submit">Register</button>
  </form>
</body>
</html>
"#
    )
}

fn register_result(signer: &Signer) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Registered {domain}</title></head>
<body>
  <h1>'{domain}' is now an OWID signer</h1>
  <p>Name: {name}</p>
  <p>Terms: <a href="{terms}">{terms}</a></p>
  <p>Keys: {keys}</p>
</body>
</html>
"#,
        domain = signer.domain,
        name = signer.name,
        terms = signer.terms_url,
        keys = signer.keys.len(),
    )
}
