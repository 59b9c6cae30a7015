use anyhow::anyhow;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::errors::EmptyResult;

// The cache is a library, so the embedding process may already own the global subscriber; in
// that case we hand the error back instead of panicking like `init()` would.
pub fn setup(env_filter: &str) -> EmptyResult {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW)
        .with_target(false)
        .with_env_filter(env_filter)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("could not install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_setup_twice() {
        // Something else in the test binary may have claimed the global subscriber first, so all
        // we can say for sure is that the second install fails.
        let _ = setup("info");
        assert!(setup("debug").is_err());
    }
}
