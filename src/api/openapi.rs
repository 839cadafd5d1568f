use super::handlers::{admin, auth, dashboard, health, session};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Endpoints registered here with `.routes(routes!(...))` are served and
/// documented. Routes added in `api::app` (`/`, the document itself) are not.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(session::exchange_link, session::store_session))
        .routes(routes!(auth::login))
        .routes(routes!(auth::register))
        .routes(routes!(auth::recover))
        .routes(routes!(auth::password))
        .routes(routes!(auth::logout))
        .routes(routes!(admin::delete_user))
        .routes(routes!(dashboard::dashboard));

    router.get_openapi_mut().tags = Some(vec![
        tag("session", "Token exchange into session cookies"),
        tag("auth", "Sign-in, sign-up, password recovery and sign-out"),
        tag("admin", "User administration, admin role only"),
        tag("dashboard", "Landing page data"),
        tag("health", "Service health"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Cargo.toml metadata instead of the utoipa-axum defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        Some(value.trim()).filter(|v| !v.is_empty())
    }
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Back Office Team"));
            assert_eq!(contact.email.as_deref(), Some("backoffice@gatehouse.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "session"));
        assert!(tags.iter().any(|tag| tag.name == "admin"));

        let paths = &spec.paths.paths;
        assert!(paths.contains_key("/api/auth/session"));
        assert!(paths.contains_key("/api/auth/login"));
        assert!(paths.contains_key("/api/admin/users/{id}"));
        assert!(paths.contains_key("/dashboard"));
        assert!(paths.contains_key("/health"));

        let exchange = &paths["/api/auth/session"];
        assert!(exchange.get.is_some());
        assert!(exchange.post.is_some());
    }

    #[test]
    fn health_documents_single_object() -> anyhow::Result<()> {
        let spec = serde_json::to_value(openapi())?;
        for status in ["200", "503"] {
            let schema = &spec["paths"]["/health"]["get"]["responses"][status]["content"]
                ["application/json"]["schema"];
            assert_eq!(schema["$ref"], "#/components/schemas/Health", "{status}");
            assert!(schema.get("items").is_none());
        }
        Ok(())
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Back Office Team <backoffice@gatehouse.dev>"),
            (Some("Back Office Team"), Some("backoffice@gatehouse.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<a@b.c>"), (None, Some("a@b.c")));
    }
}
