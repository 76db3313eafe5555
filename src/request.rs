use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Streaming endpoints exposed by the GPT proxy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Translate,
    ProsConsStream,
}

impl Endpoint {
    /// Path suffix appended to the configured base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Translate => "/translate",
            Endpoint::ProsConsStream => "/pros-cons-discusser-stream",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Translate => write!(f, "translate"),
            Endpoint::ProsConsStream => write!(f, "pros-cons-stream"),
        }
    }
}

// ---------------------------------------------------------------------------
// Target languages
// ---------------------------------------------------------------------------

/// Target languages offered for translation. The API expects the
/// lowercase Spanish name, accents included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Language {
    #[value(alias = "german")]
    Aleman,
    #[value(alias = "arabic")]
    Arabe,
    #[value(alias = "bengali")]
    Bengali,
    #[value(alias = "french")]
    Frances,
    Hindi,
    #[value(alias = "english")]
    Ingles,
    #[value(alias = "japanese")]
    Japones,
    #[value(alias = "mandarin")]
    Mandarin,
    #[value(alias = "portuguese")]
    Portugues,
    #[value(alias = "russian")]
    Ruso,
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::Aleman,
        Language::Arabe,
        Language::Bengali,
        Language::Frances,
        Language::Hindi,
        Language::Ingles,
        Language::Japones,
        Language::Mandarin,
        Language::Portugues,
        Language::Ruso,
    ];

    /// Wire value sent as `lang`.
    pub fn id(&self) -> &'static str {
        match self {
            Language::Aleman => "alemán",
            Language::Arabe => "árabe",
            Language::Bengali => "bengalí",
            Language::Frances => "francés",
            Language::Hindi => "hindi",
            Language::Ingles => "inglés",
            Language::Japones => "japonés",
            Language::Mandarin => "mandarín",
            Language::Portugues => "portugués",
            Language::Ruso => "ruso",
        }
    }

    /// Capitalized label used in the echoed user message.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Aleman => "Alemán",
            Language::Arabe => "Árabe",
            Language::Bengali => "Bengalí",
            Language::Frances => "Francés",
            Language::Hindi => "Hindi",
            Language::Ingles => "Inglés",
            Language::Japones => "Japonés",
            Language::Mandarin => "Mandarín",
            Language::Portugues => "Portugués",
            Language::Ruso => "Ruso",
        }
    }

    /// Look up a language by its wire id (case-insensitive).
    pub fn from_id(id: &str) -> Option<Language> {
        let id = id.to_lowercase();
        Language::ALL.into_iter().find(|l| l.id() == id)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// JSON body for a streaming request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// One streaming call: where it goes, what it sends, and the token that
/// can abort it. Fields are private so a request cannot change once issued.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    endpoint: Endpoint,
    payload: StreamPayload,
    cancel: CancellationToken,
}

impl StreamRequest {
    pub fn translate(prompt: impl Into<String>, lang: Language, cancel: CancellationToken) -> Self {
        StreamRequest {
            endpoint: Endpoint::Translate,
            payload: StreamPayload {
                prompt: prompt.into(),
                lang: Some(lang.id().to_string()),
            },
            cancel,
        }
    }

    pub fn pros_cons(prompt: impl Into<String>, cancel: CancellationToken) -> Self {
        StreamRequest {
            endpoint: Endpoint::ProsConsStream,
            payload: StreamPayload {
                prompt: prompt.into(),
                lang: None,
            },
            cancel,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn payload(&self) -> &StreamPayload {
        &self.payload
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The user-facing line echoed before the response, e.g.
    /// `Traduce: "hola" al idioma Inglés`.
    pub fn echo(&self) -> String {
        match (&self.endpoint, self.payload.lang.as_deref().and_then(Language::from_id)) {
            (Endpoint::Translate, Some(lang)) => {
                format!("Traduce: \"{}\" al idioma {}", self.payload.prompt, lang.label())
            }
            _ => self.payload.prompt.clone(),
        }
    }
}
