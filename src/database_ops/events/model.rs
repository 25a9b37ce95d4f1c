use sqlx::FromRow;

/// One row of `public.events`.
///
/// `reference` is kept in its stored string form; use [`Event::parent_ref`]
/// to read it as a typed link.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Event {
    pub id: i64,
    pub reference: String,
    pub import_source_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub description_format: i16,
    pub start_time: i64,
    pub duration: i64,
    pub priority: Option<i32>,
    pub location: String,
    pub category_id: i64,
    pub course_id: i64,
    pub group_id: i64,
    pub user_id: i64,
}

impl Event {
    /// Organic record with empty reference and no import source; callers fill
    /// in whatever the case needs.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            reference: String::new(),
            import_source_id: None,
            name: name.into(),
            description: String::new(),
            description_format: 1,
            start_time: 0,
            duration: 0,
            priority: None,
            location: String::new(),
            category_id: 0,
            course_id: 0,
            group_id: 0,
            user_id: 0,
        }
    }

    pub fn parent_ref(&self) -> Option<ParentRef<'_>> {
        ParentRef::parse(&self.reference)
    }

    /// Candidate predicate: imported by a subscription and pointing back into
    /// this instance.
    pub fn is_candidate(&self, suffix: &InstanceSuffix) -> bool {
        self.import_source_id.is_some() && suffix.matches(&self.reference)
    }
}

/// Typed view of a legacy `"<parentId>@<instance>"` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef<'a> {
    pub parent_id: i64,
    pub instance: &'a str,
}

impl<'a> ParentRef<'a> {
    /// Split on the first `@`. Anything other than a digits-only id that fits
    /// in `i64` followed by `@` yields `None`.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (id_part, instance) = raw.split_once('@')?;
        if id_part.is_empty() || !id_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let parent_id = id_part.parse::<i64>().ok()?;
        Some(Self {
            parent_id,
            instance,
        })
    }
}

/// Host-derived string identifying references minted by this deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSuffix(String);

impl InstanceSuffix {
    pub fn new(raw: impl Into<String>) -> anyhow::Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        anyhow::ensure!(!trimmed.is_empty(), "instance suffix must not be empty");
        Ok(Self(trimmed.to_string()))
    }

    /// Derive from a public base URL: scheme and trailing slashes are dropped,
    /// so `https://moodle.example.org/` becomes `moodle.example.org`.
    pub fn from_base_url(base_url: &str) -> anyhow::Result<Self> {
        let trimmed = base_url.trim();
        let without_scheme = trimmed
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(trimmed);
        Self::new(without_scheme.trim_end_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, reference: &str) -> bool {
        reference
            .strip_suffix(self.0.as_str())
            .is_some_and(|head| head.ends_with('@'))
    }

    /// Reference string for a record of this instance.
    pub fn reference_for(&self, id: i64) -> String {
        format!("{id}@{}", self.0)
    }

    /// `LIKE` pattern matching `%@<suffix>` with `%`, `_` and `\` escaped.
    pub fn like_pattern(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        out.push_str("%@");
        for ch in self.0.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }
}

impl std::fmt::Display for InstanceSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
