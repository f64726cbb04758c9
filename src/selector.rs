//! Profile selection.
//!
//! Turns the raw `-p` tokens into the set of profiles to sync:
//!
//! - `old:new` syncs `old` and writes its credentials under `new`
//! - `prefix*` selects every named profile starting with `prefix`
//! - `name` selects exactly one named profile
//!
//! Unknown profiles are reported back as [`SkipReason`]s rather than errors;
//! the caller decides how to surface them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

pub const RENAME_SEPARATOR: char = ':';
pub const WILDCARD: char = '*';

/// A single `-p` argument, classified before any validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionToken<'a> {
    Exact(&'a str),
    Rename { from: &'a str, to: &'a str },
    Wildcard { prefix: &'a str },
}

impl<'a> SelectionToken<'a> {
    /// Rename wins over wildcard, wildcard over exact. A token with more than
    /// one separator or an empty side is not a rename and ends up exact.
    pub fn classify(raw: &'a str) -> Self {
        let mut parts = raw.split(RENAME_SEPARATOR);
        if let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) {
            if !from.is_empty() && !to.is_empty() {
                return Self::Rename { from, to };
            }
        }

        match raw.strip_suffix(WILDCARD) {
            Some(prefix) => Self::Wildcard { prefix },
            None => Self::Exact(raw),
        }
    }
}

/// Why a token contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownProfile { profile: String, config: PathBuf },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProfile { profile, config } => write!(
                f,
                "Named profile `{}` is not specified in {}. Skipping...",
                profile,
                config.display()
            ),
        }
    }
}

/// Profiles to sync plus the renames requested for some of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub profiles: BTreeSet<String>,
    pub renames: BTreeMap<String, String>,
}

impl ResolvedSelection {
    pub fn rename_of(&self, profile: &str) -> Option<&str> {
        self.renames.get(profile).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub resolved: ResolvedSelection,
    pub skipped: Vec<SkipReason>,
}

/// What one token adds to the selection.
enum Contribution<'a> {
    Profiles(Vec<&'a str>),
    Rename { from: &'a str, to: &'a str },
}

fn contribution<'a>(
    token: &SelectionToken<'a>,
    universe: &'a BTreeSet<String>,
    config: &Path,
) -> Result<Contribution<'a>, SkipReason> {
    let known = |name: &str| {
        if universe.contains(name) {
            Ok(())
        } else {
            Err(SkipReason::UnknownProfile {
                profile: name.to_string(),
                config: config.to_path_buf(),
            })
        }
    };

    match *token {
        SelectionToken::Rename { from, to } => {
            known(from)?;
            Ok(Contribution::Rename { from, to })
        }
        SelectionToken::Wildcard { prefix } => Ok(Contribution::Profiles(
            universe
                .iter()
                .filter(|p| p.starts_with(prefix))
                .map(String::as_str)
                .collect(),
        )),
        SelectionToken::Exact(name) => {
            known(name)?;
            Ok(Contribution::Profiles(vec![name]))
        }
    }
}

/// Resolves `tokens` against the named-profile `universe`.
///
/// No tokens means every named profile. `config` only appears in skip
/// reasons.
pub fn resolve<S: AsRef<str>>(tokens: &[S], universe: &BTreeSet<String>, config: &Path) -> Selection {
    if tokens.is_empty() {
        return Selection {
            resolved: ResolvedSelection {
                profiles: universe.clone(),
                renames: BTreeMap::new(),
            },
            skipped: Vec::new(),
        };
    }

    tokens
        .iter()
        .map(|raw| contribution(&SelectionToken::classify(raw.as_ref()), universe, config))
        .fold(Selection::default(), |mut acc, result| {
            match result {
                Ok(Contribution::Profiles(names)) => {
                    acc.resolved
                        .profiles
                        .extend(names.into_iter().map(str::to_string));
                }
                Ok(Contribution::Rename { from, to }) => {
                    acc.resolved.profiles.insert(from.to_string());
                    // keep the outcome independent of token order
                    let target = acc.resolved.renames.entry(from.to_string()).or_default();
                    if to > target.as_str() {
                        *target = to.to_string();
                    }
                }
                Err(reason) => acc.skipped.push(reason),
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "/home/user/.aws/config";

    fn universe(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn run(tokens: &[&str], names: &[&str]) -> Selection {
        resolve(tokens, &universe(names), Path::new(CONFIG))
    }

    #[test]
    fn test_classify() {
        assert_eq!(SelectionToken::classify("dev"), SelectionToken::Exact("dev"));
        assert_eq!(
            SelectionToken::classify("dev:developer"),
            SelectionToken::Rename { from: "dev", to: "developer" }
        );
        assert_eq!(
            SelectionToken::classify("dev*"),
            SelectionToken::Wildcard { prefix: "dev" }
        );
        assert_eq!(SelectionToken::classify("*"), SelectionToken::Wildcard { prefix: "" });
        // rename shape is checked first
        assert_eq!(
            SelectionToken::classify("dev*:x"),
            SelectionToken::Rename { from: "dev*", to: "x" }
        );
    }

    #[test]
    fn test_classify_malformed_rename_falls_through() {
        assert_eq!(SelectionToken::classify("a:b:c"), SelectionToken::Exact("a:b:c"));
        assert_eq!(SelectionToken::classify(":b"), SelectionToken::Exact(":b"));
        assert_eq!(SelectionToken::classify("a:"), SelectionToken::Exact("a:"));
        assert_eq!(
            SelectionToken::classify("a:*"),
            SelectionToken::Rename { from: "a", to: "*" }
        );
        assert_eq!(SelectionToken::classify("a:b:*"), SelectionToken::Wildcard { prefix: "a:b:" });
    }

    #[test]
    fn test_empty_tokens_selects_everything() {
        let sel = run(&[], &["dev", "prod", "staging"]);
        assert_eq!(sel.resolved.profiles, universe(&["dev", "prod", "staging"]));
        assert!(sel.resolved.renames.is_empty());
        assert!(sel.skipped.is_empty());
    }

    #[test]
    fn test_rename() {
        let sel = run(&["dev:developer"], &["dev", "prod"]);
        assert_eq!(sel.resolved.profiles, universe(&["dev"]));
        assert_eq!(sel.resolved.rename_of("dev"), Some("developer"));
        assert_eq!(sel.resolved.renames.len(), 1);
    }

    #[test]
    fn test_rename_unknown_source_is_skipped() {
        let sel = run(&["ghost:spirit", "prod"], &["dev", "prod"]);
        assert_eq!(sel.resolved.profiles, universe(&["prod"]));
        assert!(sel.resolved.renames.is_empty());
        assert_eq!(
            sel.skipped,
            vec![SkipReason::UnknownProfile {
                profile: "ghost".to_string(),
                config: PathBuf::from(CONFIG),
            }]
        );
    }

    #[test]
    fn test_wildcard() {
        let sel = run(&["dev*"], &["dev1", "dev2", "prod"]);
        assert_eq!(sel.resolved.profiles, universe(&["dev1", "dev2"]));
        assert!(sel.skipped.is_empty());
    }

    #[test]
    fn test_wildcard_without_match_is_not_an_error() {
        let sel = run(&["qa*"], &["dev1", "prod"]);
        assert!(sel.resolved.profiles.is_empty());
        assert!(sel.skipped.is_empty());
    }

    #[test]
    fn test_unknown_exact_profile() {
        let sel = run(&["ghost"], &["dev"]);
        assert!(sel.resolved.profiles.is_empty());
        assert_eq!(sel.skipped.len(), 1);
        assert_eq!(
            sel.skipped[0].to_string(),
            "Named profile `ghost` is not specified in /home/user/.aws/config. Skipping..."
        );
    }

    #[test]
    fn test_malformed_rename_is_skipped_as_unknown() {
        let sel = run(&["dev:a:b"], &["dev"]);
        assert!(sel.resolved.profiles.is_empty());
        assert!(matches!(
            &sel.skipped[..],
            [SkipReason::UnknownProfile { profile, .. }] if profile == "dev:a:b"
        ));
    }

    #[test]
    fn test_overlapping_tokens_are_deduplicated() {
        let sel = run(&["dev1", "dev*", "dev1:renamed", "dev1"], &["dev1", "dev2", "prod"]);
        assert_eq!(sel.resolved.profiles, universe(&["dev1", "dev2"]));
        assert_eq!(sel.resolved.rename_of("dev1"), Some("renamed"));
        assert_eq!(sel.resolved.rename_of("dev2"), None);
    }

    #[test]
    fn test_token_order_does_not_matter() {
        let names = ["dev1", "dev2", "prod", "prod-eu"];
        let tokens = ["prod:a", "dev*", "ghost", "prod:b", "prod-eu"];
        let mut reversed = tokens;
        reversed.reverse();

        let forward = run(&tokens, &names);
        let backward = run(&reversed, &names);
        assert_eq!(forward.resolved, backward.resolved);
        assert_eq!(forward.resolved.rename_of("prod"), Some("b"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let names = ["dev", "prod", "staging"];
        let tokens = ["dev:d", "st*", "nope"];
        assert_eq!(run(&tokens, &names), run(&tokens, &names));
    }

    #[test]
    fn test_accepts_owned_tokens() {
        let tokens = vec!["prod".to_string()];
        let sel = resolve(&tokens, &universe(&["prod"]), Path::new(CONFIG));
        assert_eq!(sel.resolved.profiles, universe(&["prod"]));
    }
}
