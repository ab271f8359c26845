//! The allow-list policy controlling opaque-object (de)serialization
//! (§4.8). Separate policies govern freeze and thaw; a denied class is
//! never instantiated on thaw — it is quarantined instead, so the stream
//! stays aligned and the caller can opt into decoding it later via
//! [`crate::read_quarantined_unsafe`].
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use regex::Regex;

/// One entry in an [`AllowList`]'s pattern table.
#[derive(Clone, Debug)]
struct Pattern {
    /// `*` is translated to `.*`; everything else is matched literally.
    regex: Regex,
    allow: bool,
}

fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::with_capacity(glob.len() + 4);
    pattern.push('^');
    for part in glob.split('*') {
        pattern.push_str(&regex::escape(part));
        pattern.push_str(".*");
    }
    for _ in 0..".*".len() {
        pattern.pop();
    }
    pattern.push('$');
    Regex::new(&pattern).expect("glob-derived regex is always valid")
}

/// How an [`AllowList`] treats classes that match no explicit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DefaultRule {
    Deny,
    Allow,
    /// Allow every class, and record which ones were seen for later audit
    /// (`taoensso/nippy`'s "allow-and-record" transitional mode).
    AllowAndRecord,
}

/// Bound on how many distinct class names an `AllowAndRecord` policy
/// keeps frequency counts for.
const MAX_TRACKED_CLASSES: usize = 1000;
/// Total observation count that triggers a trim pass back down toward
/// [`MAX_TRACKED_CLASSES`].
const TRIM_TRIGGER: u64 = 16_000;

/// Controls which opaque class names may be frozen or re-materialized.
pub struct AllowList {
    patterns: Vec<Pattern>,
    default: DefaultRule,
    record: Mutex<HashMap<String, u64>>,
}

impl std::fmt::Debug for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AllowList")
            .field("patterns", &self.patterns.len())
            .field("default", &self.default)
            .finish()
    }
}

impl AllowList {
    /// Denies every class not explicitly allowed.
    pub fn deny_all() -> AllowList {
        AllowList { patterns: Vec::new(), default: DefaultRule::Deny, record: Mutex::new(HashMap::new()) }
    }

    /// Allows every class.
    pub fn allow_all() -> AllowList {
        AllowList { patterns: Vec::new(), default: DefaultRule::Allow, record: Mutex::new(HashMap::new()) }
    }

    /// Allows every class, recording observed class names (bounded) for
    /// a later migration to an explicit list.
    pub fn allow_and_record() -> AllowList {
        AllowList { patterns: Vec::new(), default: DefaultRule::AllowAndRecord, record: Mutex::new(HashMap::new()) }
    }

    /// Starts from [`deny_all`](Self::deny_all) plus a fixed set of
    /// explicitly allowed literal class names. Used as the conservative
    /// default thaw policy.
    pub fn deny_all_except(classes: impl IntoIterator<Item = impl Into<String>>) -> AllowList {
        let mut list = AllowList::deny_all();
        for class in classes {
            list.allow(class.into());
        }
        list
    }

    /// Adds an explicit allow rule. `pattern` may contain `*` wildcards.
    pub fn allow(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        self.patterns.push(Pattern { regex: glob_to_regex(&pattern), allow: true });
    }

    /// Adds an explicit deny rule, overriding a broader allow. `pattern`
    /// may contain `*` wildcards.
    pub fn deny(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        self.patterns.push(Pattern { regex: glob_to_regex(&pattern), allow: false });
    }

    /// `true` if `class_name` is permitted under this policy. Patterns
    /// are checked in registration order; the last match wins, falling
    /// back to the policy's default rule.
    pub fn is_allowed(&self, class_name: &str) -> bool {
        let verdict = self
            .patterns
            .iter()
            .rev()
            .find(|p| p.regex.is_match(class_name))
            .map(|p| p.allow);

        match verdict {
            Some(allowed) => allowed,
            None => match self.default {
                DefaultRule::Deny => false,
                DefaultRule::Allow => true,
                DefaultRule::AllowAndRecord => {
                    self.record(class_name);
                    true
                }
            },
        }
    }

    fn record(&self, class_name: &str) {
        let mut record = self.record.lock().expect("allow-list audit record poisoned");
        *record.entry(class_name.to_string()).or_insert(0) += 1;
        let total: u64 = record.values().sum();
        if total > TRIM_TRIGGER && record.len() > MAX_TRACKED_CLASSES {
            let before = record.len();
            let mut by_count: Vec<(String, u64)> = record.drain().collect();
            by_count.sort_by(|a, b| b.1.cmp(&a.1));
            by_count.truncate(MAX_TRACKED_CLASSES);
            tracing::debug!(before, after = by_count.len(), "trimmed allow-and-record audit table");
            *record = by_count.into_iter().collect();
        }
    }

    /// A snapshot of the observed-class audit table (only populated when
    /// using [`allow_and_record`](Self::allow_and_record)).
    pub fn audit_snapshot(&self) -> HashMap<String, u64> {
        self.record.lock().expect("allow-list audit record poisoned").clone()
    }
}

/// Builds an [`AllowList`] from the crate's environment-variable naming
/// convention: a comma-or-colon-separated base list plus an additive
/// list, or the literal `allow-and-record`.
pub(crate) fn from_env(base_var: &str, add_var: &str, default: fn() -> AllowList) -> AllowList {
    let base = std::env::var(base_var).ok();
    let mut list = match base.as_deref() {
        Some("allow-and-record") => AllowList::allow_and_record(),
        Some(spec) if !spec.is_empty() => AllowList::deny_all_except(split_spec(spec)),
        _ => default(),
    };
    if let Ok(add) = std::env::var(add_var) {
        for class in split_spec(&add) {
            list.allow(class);
        }
    }
    list
}

fn split_spec(spec: &str) -> Vec<String> {
    spec.split([',', ':']).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

/// Process-wide freeze-side and thaw-side policies, seeded from the
/// environment at first use. See SPEC_FULL.md §10.3.
pub static FREEZE_ALLOWLIST: RwLock<Option<AllowList>> = RwLock::new(None);
pub static THAW_ALLOWLIST: RwLock<Option<AllowList>> = RwLock::new(None);
