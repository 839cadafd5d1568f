use crate::GIT_COMMIT_HASH;

// axum handler for /
pub async fn root() -> String {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        GIT_COMMIT_HASH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_name_and_version() {
        let banner = root().await;
        assert!(banner.starts_with(env!("CARGO_PKG_NAME")));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
    }
}
