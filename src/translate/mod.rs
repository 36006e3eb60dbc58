//! Translation Layer
//!
//! Collaborator contract for translation plus the three concrete backends
//! (Google, DeepL, Baidu). Backend selection is a configuration enum, never a
//! display string; failures surface as [`TranslationError`] so the session
//! can substitute a visible placeholder instead of crashing the cycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised by a translation backend
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Credentials required by the backend were not configured
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
    /// The HTTP request itself failed
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with an error (quota, auth, bad language pair)
    #[error("translation service error: {0}")]
    Service(String),
    /// The response body did not have the expected shape
    #[error("unexpected translation response: {0}")]
    InvalidResponse(String),
}

/// Available translation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationService {
    /// Google's free web endpoint, no credentials required
    #[default]
    Google,
    /// DeepL API, key required; free-tier keys end in `:fx`
    Deepl,
    /// Baidu fanyi API, requires app id and key
    Baidu,
}

/// Credentials and backend selection for translation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslationSettings {
    /// Which backend to use
    pub service: TranslationService,
    /// DeepL API key; free-tier keys end in `:fx`
    pub deepl_api_key: Option<String>,
    /// Baidu application id
    pub baidu_app_id: Option<String>,
    /// Baidu application key
    pub baidu_api_key: Option<String>,
}

/// Translation collaborator
pub trait Translator: Send {
    /// Translate `text` between the given ISO language codes
    ///
    /// `source` may be `auto` for source-language detection.
    fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, TranslationError>;
}

/// Strip a region suffix and normalize case: `zh-CN` -> `zh`
pub fn base_lang(code: &str) -> String {
    code.trim()
        .to_lowercase()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Approximate translated-to-source length ratio for a language pair
///
/// Informational only; alignment never branches on it.
pub fn expansion_factor(source: &str, target: &str) -> f32 {
    let src_unspaced = crate::layout::is_unspaced_script(source);
    let tgt_unspaced = crate::layout::is_unspaced_script(target);

    if src_unspaced && !tgt_unspaced {
        return 1.8;
    }
    if !src_unspaced && tgt_unspaced {
        return 0.6;
    }

    let mut src = base_lang(source);
    if src == "auto" {
        src = "en".to_string();
    }
    let tgt = base_lang(target);

    match (src.as_str(), tgt.as_str()) {
        ("en", "de") => 1.3,
        ("de", "en") => 0.77,
        ("en", "fr") => 1.15,
        ("fr", "en") => 0.87,
        ("en", "es") => 1.25,
        ("es", "en") => 0.8,
        _ => 1.0,
    }
}

/// Build the configured translator
pub fn build_translator(
    settings: &TranslationSettings,
) -> Result<Box<dyn Translator>, TranslationError> {
    match settings.service {
        TranslationService::Google => Ok(Box::new(GoogleTranslator::new())),
        TranslationService::Deepl => Ok(Box::new(DeeplTranslator::new(
            settings.deepl_api_key.clone(),
        ))),
        TranslationService::Baidu => {
            let app_id = settings
                .baidu_app_id
                .clone()
                .filter(|id| !id.is_empty())
                .ok_or(TranslationError::MissingCredentials("baidu app id"))?;
            let app_key = settings
                .baidu_api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or(TranslationError::MissingCredentials("baidu api key"))?;
            Ok(Box::new(BaiduTranslator::new(app_id, app_key)))
        }
    }
}

/// Google translate via the free `gtx` endpoint
pub struct GoogleTranslator {
    client: reqwest::blocking::Client,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for GoogleTranslator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        debug!(service = "google", source, target, chars = text.len(), "translating");

        let response = self
            .client
            .get("https://translate.googleapis.com/translate_a/single")
            .query(&[
                ("client", "gtx"),
                ("dt", "t"),
                ("sl", &base_lang(source)),
                ("tl", &base_lang(target)),
                ("q", text),
            ])
            .send()?
            .error_for_status()
            .map_err(|e| TranslationError::Service(e.to_string()))?;

        let body: serde_json::Value = response.json()?;

        // The gtx response is a nested array; element [0] holds one
        // [translated, original, ...] entry per source segment.
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| TranslationError::InvalidResponse("missing segment array".into()))?;

        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
                translated.push_str(part);
            }
        }

        Ok(translated)
    }
}

/// DeepL API client
pub struct DeeplTranslator {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
}

impl DeeplTranslator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn endpoint(&self) -> &'static str {
        // Free-tier keys end in ":fx" and use the free host
        match &self.api_key {
            Some(key) if !key.ends_with(":fx") => "https://api.deepl.com/v2/translate",
            _ => "https://api-free.deepl.com/v2/translate",
        }
    }
}

#[derive(Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl Translator for DeeplTranslator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        debug!(service = "deepl", source, target, chars = text.len(), "translating");

        let key = self
            .api_key
            .as_deref()
            .ok_or(TranslationError::MissingCredentials("deepl api key"))?;

        let mut form: Vec<(&str, String)> = vec![
            ("text", text.to_string()),
            ("target_lang", base_lang(target).to_uppercase()),
        ];
        let source = base_lang(source);
        if source != "auto" && !source.is_empty() {
            form.push(("source_lang", source.to_uppercase()));
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("DeepL-Auth-Key {key}"))
            .form(&form)
            .send()?;

        if !response.status().is_success() {
            return Err(TranslationError::Service(format!(
                "deepl returned {}",
                response.status()
            )));
        }

        let body: DeeplResponse = response.json()?;
        let translated = body
            .translations
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>()
            .join(" ");

        if translated.is_empty() {
            return Err(TranslationError::InvalidResponse(
                "empty translation list".into(),
            ));
        }

        Ok(translated)
    }
}

/// Baidu fanyi API client
pub struct BaiduTranslator {
    client: reqwest::blocking::Client,
    app_id: String,
    app_key: String,
}

impl BaiduTranslator {
    pub fn new(app_id: String, app_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            app_id,
            app_key,
        }
    }
}

/// Baidu request signature: md5 over appid + query + salt + key
fn baidu_sign(app_id: &str, query: &str, salt: &str, key: &str) -> String {
    format!("{:x}", md5::compute(format!("{app_id}{query}{salt}{key}")))
}

#[derive(Deserialize)]
struct BaiduResponse {
    error_code: Option<String>,
    error_msg: Option<String>,
    trans_result: Option<Vec<BaiduTranslation>>,
}

#[derive(Deserialize)]
struct BaiduTranslation {
    dst: String,
}

impl Translator for BaiduTranslator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        debug!(service = "baidu", source, target, chars = text.len(), "translating");

        let salt = format!("{}", std::process::id());
        let sign = baidu_sign(&self.app_id, text, &salt, &self.app_key);

        let response = self
            .client
            .get("https://fanyi-api.baidu.com/api/trans/vip/translate")
            .query(&[
                ("q", text),
                ("from", &base_lang(source)),
                ("to", &base_lang(target)),
                ("appid", &self.app_id),
                ("salt", &salt),
                ("sign", &sign),
            ])
            .send()?
            .error_for_status()
            .map_err(|e| TranslationError::Service(e.to_string()))?;

        let body: BaiduResponse = response.json()?;

        if let Some(code) = body.error_code {
            let msg = body.error_msg.unwrap_or_default();
            return Err(TranslationError::Service(format!(
                "baidu error {code}: {msg}"
            )));
        }

        let translated = body
            .trans_result
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.dst)
            .collect::<Vec<_>>()
            .join("\n");

        if translated.is_empty() {
            return Err(TranslationError::InvalidResponse(
                "empty translation result".into(),
            ));
        }

        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_lang() {
        assert_eq!(base_lang("zh-CN"), "zh");
        assert_eq!(base_lang("EN-us"), "en");
        assert_eq!(base_lang(" de "), "de");
        assert_eq!(base_lang("auto"), "auto");
        assert_eq!(base_lang(""), "");
    }

    #[test]
    fn test_baidu_sign_known_vector() {
        // Worked example from the Baidu API documentation
        let sign = baidu_sign("2015063000000001", "apple", "1435660288", "12345678");
        assert_eq!(sign, "f89f9594663708c1605f3d736d01d2d4");
    }

    #[test]
    fn test_build_translator_baidu_requires_credentials() {
        let settings = TranslationSettings {
            service: TranslationService::Baidu,
            ..Default::default()
        };
        assert!(matches!(
            build_translator(&settings),
            Err(TranslationError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_build_translator_google_default() {
        let settings = TranslationSettings::default();
        assert!(build_translator(&settings).is_ok());
    }

    #[test]
    fn test_expansion_factor_table() {
        assert!((expansion_factor("en", "de") - 1.3).abs() < 0.001);
        assert!((expansion_factor("de", "en") - 0.77).abs() < 0.001);
        assert!((expansion_factor("auto", "de") - 1.3).abs() < 0.001);
        assert!((expansion_factor("pt", "it") - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_expansion_factor_unspaced_pairs() {
        assert!((expansion_factor("ja", "en") - 1.8).abs() < 0.001);
        assert!((expansion_factor("en", "zh-CN") - 0.6).abs() < 0.001);
        // Unspaced to unspaced uses the standard table default
        assert!((expansion_factor("ja", "ko") - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_deepl_endpoint_selection() {
        let free = DeeplTranslator::new(Some("abc:fx".to_string()));
        assert_eq!(free.endpoint(), "https://api-free.deepl.com/v2/translate");
        let pro = DeeplTranslator::new(Some("abc".to_string()));
        assert_eq!(pro.endpoint(), "https://api.deepl.com/v2/translate");
        let none = DeeplTranslator::new(None);
        assert_eq!(none.endpoint(), "https://api-free.deepl.com/v2/translate");
    }

    #[test]
    fn test_service_serde_names() {
        assert_eq!(
            toml::to_string(&TranslationSettings::default())
                .unwrap()
                .lines()
                .next()
                .unwrap(),
            "service = \"google\""
        );
    }
}
