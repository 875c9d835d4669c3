/// Organisation searched when none is configured.
pub const DEFAULT_ORG: &str = "openshift";

/// Labels the retest query filters on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KnownLabel {
    Approved,
    Lgtm,
    Hold,
    NeedsRebase,
}

impl KnownLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownLabel::Approved => "approved",
            KnownLabel::Lgtm => "lgtm",
            KnownLabel::Hold => "hold",
            KnownLabel::NeedsRebase => "needs-rebase",
        }
    }
}

/// Pull request states for GitHub search queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchState {
    Open,
}

impl SearchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchState::Open => "open",
        }
    }
}

/// Accumulates GitHub search qualifiers in the order they are added.
#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    terms: Vec<String>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&mut self, org: &str) -> &mut Self {
        self.terms.push(format!("user:{org}"));
        self
    }

    pub fn label(&mut self, label: KnownLabel) -> &mut Self {
        self.terms.push(format!("label:{}", label.as_str()));
        self
    }

    pub fn no_label(&mut self, label: KnownLabel) -> &mut Self {
        self.terms.push(format!("-label:{}", label.as_str()));
        self
    }

    pub fn state(&mut self, state: SearchState) -> &mut Self {
        self.terms.push(format!("state:{}", state.as_str()));
        self
    }

    pub fn author(&mut self, login: &str) -> &mut Self {
        self.terms.push(format!("author:{login}"));
        self
    }

    pub fn build(&self) -> String {
        self.terms.join(" ")
    }
}

/// Builds the query selecting open, approved and lgtm'd pull requests by
/// `author` that are neither held nor waiting on a rebase.
pub fn build_search_query(org: &str, author: &str) -> String {
    SearchQueryBuilder::new()
        .user(org)
        .label(KnownLabel::Approved)
        .label(KnownLabel::Lgtm)
        .no_label(KnownLabel::Hold)
        .no_label(KnownLabel::NeedsRebase)
        .state(SearchState::Open)
        .author(author)
        .build()
}
