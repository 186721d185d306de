use std::{collections::BTreeMap, sync::Arc};

use crate::models::{NewsletterDiagnostics, NewsletterIssue};

/// Environment variables the diagnostic endpoints report on.
pub const RECOGNIZED_VARS: [&str; 8] = [
    "APP_ENV",
    "DATABASE_URL",
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "SUPABASE_SERVICE_ROLE_KEY",
    "SUPABASE_JWT_SECRET",
    "RESEND_API_KEY",
    "WEBHOOK_SECRET",
];

/// EnvProbe
///
/// Answers "is this variable set?" without handing out its value. Production
/// state uses `process_env_probe`; tests build one from a fixed list.
pub type EnvProbe = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A probe over the process environment. Empty values count as unset.
pub fn process_env_probe() -> EnvProbe {
    Arc::new(|key: &str| std::env::var_os(key).is_some_and(|value| !value.is_empty()))
}

/// A probe that reports exactly `present` as set.
pub fn fixed_env_probe<I, S>(present: I) -> EnvProbe
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let present: Vec<String> = present.into_iter().map(Into::into).collect();
    Arc::new(move |key: &str| present.iter().any(|name| name == key))
}

/// env_presence
///
/// Presence map for every recognised variable.
pub fn env_presence(probe: &EnvProbe) -> BTreeMap<String, bool> {
    RECOGNIZED_VARS
        .iter()
        .map(|&name| (name.to_string(), probe(name)))
        .collect()
}

/// newsletter_report
///
/// Compares the full issue list with what the public query returned. Issues
/// that exist but are missing from the public set are listed by id.
pub fn newsletter_report(
    all: Vec<NewsletterIssue>,
    public: Vec<NewsletterIssue>,
) -> NewsletterDiagnostics {
    let hidden_ids: Vec<_> = all
        .iter()
        .filter(|issue| !public.iter().any(|p| p.id == issue.id))
        .map(|issue| issue.id)
        .collect();

    NewsletterDiagnostics {
        all_count: all.len(),
        public_count: public.len(),
        hidden_count: hidden_ids.len(),
        all,
        public,
        hidden_ids,
    }
}
