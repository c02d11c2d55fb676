//! Classifier selection for `create` and `assess`.
//!
//! - `scripted` (default): offline replies from `--respond` and `--rule KEY=LABEL`
//! - `openai`: OpenAI-compatible chat completions, configured from the
//!   environment (`OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`).
//!   Requires the `openai` feature.

use anyhow::Result;
use clap::{Args, ValueEnum};
use deliberatorium_core::{Classifier, ClassifierError, ScriptedClassifier, ScriptedReply};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Scripted,
    Openai,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifierArgs {
    /// Classifier backend.
    #[arg(long, value_enum, default_value_t = Backend::Scripted)]
    pub backend: Backend,

    /// Scripted reply for prompts no rule matches.
    ///
    /// Without it, unmatched prompts fail and their evidence stays unclassified.
    #[arg(long)]
    pub respond: Option<String>,

    /// Scripted reply LABEL when the evidence contains KEY (`KEY=LABEL`, repeatable).
    ///
    /// Rules are tried in order; the first match wins.
    #[arg(long = "rule", value_name = "KEY=LABEL", value_parser = parse_rule)]
    pub rules: Vec<(String, String)>,
}

pub fn parse_rule(raw: &str) -> Result<(String, String), String> {
    let (key, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid rule {raw:?} (expected KEY=LABEL)"))?;
    if key.is_empty() {
        return Err(format!("invalid rule {raw:?} (empty KEY)"));
    }
    Ok((key.to_string(), label.to_string()))
}

pub fn build_classifier(args: &ClassifierArgs) -> Result<Arc<dyn Classifier>> {
    match args.backend {
        Backend::Scripted => Ok(Arc::new(scripted(args))),
        Backend::Openai => openai_classifier(),
    }
}

fn scripted(args: &ClassifierArgs) -> ScriptedClassifier {
    let fallback = match &args.respond {
        Some(response) => ScriptedReply::Respond(response.clone()),
        None => ScriptedReply::Fail(ClassifierError::InvalidResponse(
            "no scripted rule matched".to_string(),
        )),
    };
    args.rules
        .iter()
        .fold(ScriptedClassifier::new(fallback), |classifier, (key, label)| {
            classifier.respond_when(key, label)
        })
}

#[cfg(feature = "openai")]
fn openai_classifier() -> Result<Arc<dyn Classifier>> {
    use deliberatorium_core::classifier::{OpenAiClassifier, OpenAiConfig};

    let config = OpenAiConfig::from_env()?;
    tracing::debug!(model = %config.model, base_url = %config.base_url, "using openai classifier");
    Ok(Arc::new(OpenAiClassifier::new(config)?))
}

#[cfg(not(feature = "openai"))]
fn openai_classifier() -> Result<Arc<dyn Classifier>> {
    Err(anyhow::anyhow!(
        "the openai backend is not available (rebuild with `--features openai`)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(respond: Option<&str>, rules: &[(&str, &str)]) -> ClassifierArgs {
        ClassifierArgs {
            backend: Backend::Scripted,
            respond: respond.map(str::to_string),
            rules: rules
                .iter()
                .map(|(k, l)| (k.to_string(), l.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            parse_rule("ETF inflows=yes").unwrap(),
            ("ETF inflows".to_string(), "yes".to_string())
        );
        // Only the first '=' separates
        assert_eq!(
            parse_rule("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_rule("no separator").is_err());
        assert!(parse_rule("=yes").is_err());
    }

    #[tokio::test]
    async fn test_scripted_rules_then_fallback() {
        let classifier = build_classifier(&args(Some("no"), &[("moon", "yes")])).unwrap();

        assert_eq!(classifier.classify("to the moon").await.unwrap(), "yes");
        assert_eq!(classifier.classify("meh").await.unwrap(), "no");
        assert_eq!(classifier.model_info().provider, "scripted");
    }

    #[tokio::test]
    async fn test_scripted_without_fallback_fails() {
        let classifier = build_classifier(&args(None, &[])).unwrap();

        assert!(matches!(
            classifier.classify("anything").await,
            Err(ClassifierError::InvalidResponse(_))
        ));
    }

    #[cfg(not(feature = "openai"))]
    #[test]
    fn test_openai_needs_feature() {
        let mut selection = args(None, &[]);
        selection.backend = Backend::Openai;

        let err = build_classifier(&selection).err().unwrap();
        assert!(err.to_string().contains("--features openai"));
    }
}
