use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use yenslip_ocr::{
    DocumentIntelligenceRecognizer, MockRecognizer, OcrBackend, OcrError, Vocabulary,
    VocabularyError, VisionReadRecognizer,
};

pub const DEFAULT_CONFIG_PATH: &str = "yenslip.toml";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown OCR backend '{0}' (expected vision, document or mock)")]
    UnknownBackend(String),
    #[error("invalid vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    #[default]
    Vision,
    Document,
    Mock,
}

impl FromStr for OcrBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(Self::Vision),
            "document" => Ok(Self::Document),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Holds `uploads/`, `receipts.db` and `ocr.log`.
    pub data_dir: PathBuf,
    pub ocr_backend: OcrBackendKind,
    pub vision_endpoint: Option<String>,
    pub vision_key: Option<String>,
    /// `language` hint passed to the read model.
    pub vision_language: String,
    pub di_endpoint: Option<String>,
    pub di_key: Option<String>,
    pub vocabulary_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    /// Lines returned by the mock backend.
    pub mock_lines: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("data"),
            ocr_backend: OcrBackendKind::default(),
            vision_endpoint: None,
            vision_key: None,
            vision_language: "ja".to_string(),
            di_endpoint: None,
            di_key: None,
            vocabulary_path: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            mock_lines: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Config file (if present) overridden by the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("YENSLIP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("YENSLIP_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = get("YENSLIP_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = get("YENSLIP_OCR_BACKEND") {
            self.ocr_backend = kind.parse()?;
        }
        if let Some(v) = get("VISION_ENDPOINT") {
            self.vision_endpoint = Some(v);
        }
        if let Some(v) = get("VISION_KEY") {
            self.vision_key = Some(v);
        }
        if let Some(v) = get("VISION_LANGUAGE") {
            self.vision_language = v;
        }
        if let Some(v) = get("DI_ENDPOINT") {
            self.di_endpoint = Some(v);
        }
        if let Some(v) = get("DI_KEY") {
            self.di_key = Some(v);
        }
        Ok(())
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("receipts.db")
    }

    pub fn ocr_log_path(&self) -> PathBuf {
        self.data_dir.join("ocr.log")
    }

    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        match &self.vocabulary_path {
            Some(path) => Ok(Vocabulary::from_toml(&read(path)?)?),
            None => Ok(Vocabulary::default()),
        }
    }

    pub fn recognizer(&self) -> Result<Box<dyn OcrBackend>, OcrError> {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(match self.ocr_backend {
            OcrBackendKind::Vision => Box::new(
                VisionReadRecognizer::new(&value(&self.vision_endpoint), &value(&self.vision_key))?
                    .with_language(&self.vision_language),
            ),
            OcrBackendKind::Document => Box::new(DocumentIntelligenceRecognizer::new(
                &value(&self.di_endpoint),
                &value(&self.di_key),
            )?),
            OcrBackendKind::Mock => Box::new(MockRecognizer::new(self.mock_lines.clone())),
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
