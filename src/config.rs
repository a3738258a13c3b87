//! Configuration types for the PDF-to-table pipeline.
//!
//! Every knob of all three stages lives in [`PipelineConfig`], built via
//! [`PipelineConfigBuilder`]. Stages receive the config explicitly; nothing
//! is read from global state except the LLM provider's API key, which the
//! provider factory takes from the environment.

use crate::error::Pdf2TableError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default directory for rendered page images.
pub const DEFAULT_IMAGE_DIR: &str = "extracted_images";
/// Default directory for raw model responses.
pub const DEFAULT_TEXT_DIR: &str = "extracted_txt_files";
/// Default directory for CSV output.
pub const DEFAULT_TABLE_DIR: &str = "extracted_csv_files";
/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for a pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2table::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .input("statements.pdf")
///     .dpi(300)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Local PDF path or HTTP/HTTPS URL. Required by the render stage only.
    pub input: String,

    /// Directory receiving `page_{n}.png`. Default: `extracted_images`.
    pub image_dir: PathBuf,

    /// Directory receiving `response{n}.txt`. Default: `extracted_txt_files`.
    pub text_dir: PathBuf,

    /// Directory receiving `response{n}.csv`. Default: `extracted_csv_files`.
    pub table_dir: PathBuf,

    /// Rendering DPI. Range: 72–1200. Default: 500.
    ///
    /// Small print in dense tables needs high resolution for the model to
    /// read digits reliably. Lower it when the API rejects large uploads.
    pub dpi: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library.
    /// If None, `PDFIUM_LIB_PATH` is tried, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// LLM model identifier. Default: `gpt-4o`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum tokens the model may generate per page. Default: 2000.
    pub max_tokens: usize,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Custom user instruction sent alongside each image.
    /// If None, uses [`crate::prompts::DEFAULT_USER_PROMPT`].
    pub user_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-stage and per-item events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            text_dir: PathBuf::from(DEFAULT_TEXT_DIR),
            table_dir: PathBuf::from(DEFAULT_TABLE_DIR),
            dpi: 500,
            password: None,
            pdfium_lib_path: None,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            max_tokens: 2000,
            temperature: None,
            system_prompt: None,
            user_prompt: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("input", &self.input)
            .field("image_dir", &self.image_dir)
            .field("text_dir", &self.text_dir)
            .field("table_dir", &self.table_dir)
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// System prompt in effect for this run.
    pub fn effective_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }

    /// User instruction in effect for this run.
    pub fn effective_user_prompt(&self) -> &str {
        self.user_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_USER_PROMPT)
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.config.input = input.into();
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn text_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.text_dir = dir.into();
        self
    }

    pub fn table_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.table_dir = dir.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 1200);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2TableError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 1200 {
            return Err(Pdf2TableError::InvalidConfig(format!(
                "DPI must be 72–1200, got {}",
                c.dpi
            )));
        }
        if c.max_tokens == 0 {
            return Err(Pdf2TableError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2TableError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        let dirs = [&c.image_dir, &c.text_dir, &c.table_dir];
        if dirs.iter().any(|d| d.as_os_str().is_empty()) {
            return Err(Pdf2TableError::InvalidConfig(
                "stage directories must not be empty".into(),
            ));
        }
        if dirs[0] == dirs[1] || dirs[1] == dirs[2] || dirs[0] == dirs[2] {
            return Err(Pdf2TableError::InvalidConfig(format!(
                "stage directories must differ (images: {:?}, texts: {:?}, tables: {:?})",
                c.image_dir, c.text_dir, c.table_dir
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.dpi, 500);
        assert_eq!(c.max_tokens, 2000);
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.image_dir, PathBuf::from("extracted_images"));
        assert_eq!(c.text_dir, PathBuf::from("extracted_txt_files"));
        assert_eq!(c.table_dir, PathBuf::from("extracted_csv_files"));
        assert!(c.temperature.is_none());
    }

    #[test]
    fn dpi_is_clamped() {
        let c = PipelineConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = PipelineConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 1200);
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let err = PipelineConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, Pdf2TableError::InvalidConfig(_)));
    }

    #[test]
    fn shared_directories_rejected() {
        let err = PipelineConfig::builder()
            .image_dir("out")
            .text_dir("out")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"), "got: {err}");
    }

    #[test]
    fn prompt_overrides_take_effect() {
        let c = PipelineConfig::builder()
            .system_prompt("sys")
            .user_prompt("usr")
            .build()
            .unwrap();
        assert_eq!(c.effective_system_prompt(), "sys");
        assert_eq!(c.effective_user_prompt(), "usr");

        let d = PipelineConfig::default();
        assert_eq!(d.effective_system_prompt(), crate::prompts::DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn debug_redacts_password() {
        let c = PipelineConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
