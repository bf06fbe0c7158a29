use thiserror::Error;

/// Start-up failures that abort the viewer.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create window: {0}")]
    Window(String),
    #[error("failed to initialize GPU: {0}")]
    Gpu(String),
}

impl InitError {
    /// Process exit status reported for start-up failures.
    pub const EXIT_CODE: i32 = -1;

    pub fn window(stage: &str, err: impl std::fmt::Display) -> Self {
        Self::Window(format!("{stage}: {err}"))
    }

    pub fn gpu(err: &anyhow::Error) -> Self {
        Self::Gpu(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let err = InitError::window("event loop", "no display");
        assert_eq!(
            err.to_string(),
            "failed to create window: event loop: no display"
        );
    }

    #[test]
    fn gpu_errors_keep_the_context_chain() {
        let source: anyhow::Result<()> = Err(anyhow::anyhow!("no adapter"));
        let err = source.context("requesting adapter").unwrap_err();
        assert_eq!(
            InitError::gpu(&err).to_string(),
            "failed to initialize GPU: requesting adapter: no adapter"
        );
    }
}
