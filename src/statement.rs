//! Text-level inspection of user statements, done before they reach the
//! engine: the attach pre-filter, leading keyword classification and the
//! follow-up steps a statement's outcome calls for.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use strum_macros::{Display, EnumString};

lazy_static! {
    static ref ATTACH_PATTERN: Regex = Regex::new(
        r#"(?is)^\s*ATTACH\s+(?:DATABASE\s+)?(?:'(?P<sq>[^']*)'|"(?P<dq>[^"]*)"|(?P<bare>[^\s'"]+))\s+AS\s+(?:'(?P<asq>[^']*)'|"(?P<adq>[^"]*)"|`(?P<abt>[^`]*)`|\[(?P<abr>[^\]]*)\]|(?P<abare>\w+))"#
    )
    .expect("valid attach pattern");
}

/// `ATTACH 'path' AS alias`, captured from the statement text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    pub path: String,
    pub alias: String,
}

pub fn parse_attach(sql: &str) -> Option<AttachTarget> {
    let captures = strip_leading_comments(sql)
        .map(|s| ATTACH_PATTERN.captures(s))??;

    let pick = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| captures.name(n))
            .map(|m| m.as_str().to_string())
    };

    let path = pick(&["sq", "dq", "bare"])?;
    let alias = pick(&["asq", "adq", "abt", "abr", "abare"])?;
    if alias.is_empty() {
        return None;
    }

    Some(AttachTarget { path, alias })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Keyword {
    Alter,
    Analyze,
    Attach,
    Begin,
    Commit,
    Create,
    Delete,
    Detach,
    Drop,
    End,
    Explain,
    Insert,
    Pragma,
    Reindex,
    Release,
    Replace,
    Rollback,
    Savepoint,
    Select,
    Update,
    Vacuum,
    Values,
    With,
}

impl Keyword {
    /// Statements that change the set of tables or their shape
    pub fn is_structural(&self) -> bool {
        matches!(self, Keyword::Create | Keyword::Drop | Keyword::Alter)
    }

    /// Statements that can't write anything. `WITH` isn't one of them since
    /// a CTE can wrap an INSERT/UPDATE/DELETE.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Keyword::Select | Keyword::Explain | Keyword::Values)
    }
}

/// Skip whitespace, `-- line` and `/* block */` comments
fn strip_leading_comments(sql: &str) -> Option<&str> {
    let mut rest = sql.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map(|(_, r)| r)?.trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map(|(_, r)| r)?.trim_start();
        } else {
            return Some(rest);
        }
    }
}

pub fn leading_keyword(sql: &str) -> Option<Keyword> {
    let word: String = strip_leading_comments(sql)?
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    Keyword::from_str(&word).ok()
}

/// Follow-up work after a statement ran, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStep {
    /// Write the live instance back to the durable store (and re-stamp its
    /// modification time)
    Persist,
    /// Recompute the table list from the live instance
    ReloadSchema,
    /// Re-read the catalog and reselect the active database if needed
    RebuildCatalog,
}

/// What a finished statement looked like, as far as refreshing goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOutcome {
    pub keyword: Option<Keyword>,
    pub has_row_set: bool,
    pub provisioned_database: bool,
}

/// Decide what has to happen after a statement succeeded.
///
/// Row-returning statements are always persisted unless `persist_read_only`
/// is off and the statement provably can't write.
pub fn plan_refresh(outcome: &StatementOutcome, persist_read_only: bool) -> Vec<RefreshStep> {
    let structural = outcome.keyword.map(|k| k.is_structural()).unwrap_or(false);
    let read_only = outcome.keyword.map(|k| k.is_read_only()).unwrap_or(false);

    let mut steps = vec![];
    if outcome.has_row_set {
        if persist_read_only || !read_only {
            steps.push(RefreshStep::Persist);
        }
        steps.push(RefreshStep::ReloadSchema);
    } else {
        steps.push(RefreshStep::Persist);
        steps.push(RefreshStep::ReloadSchema);
        if structural {
            steps.push(RefreshStep::RebuildCatalog);
        }
    }

    if outcome.provisioned_database && !steps.contains(&RefreshStep::RebuildCatalog) {
        steps.push(RefreshStep::RebuildCatalog);
    }

    steps
}
