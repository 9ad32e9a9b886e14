/// Directory and file-name segments as a tagged AST
///
/// Every filesystem name is classified exactly once into a [`Segment`]; route
/// builders only ever look at the AST, never at raw names.
use crate::app::InterceptConvention;

/// Which file convention a name is classified under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// `pages/`: only static and bracket segments
    Pages,
    /// `app/`: adds groups, slots, intercepts and private folders
    App,
}

/// A classified path segment
///
/// # Examples
///
/// ```
/// use vinext_router::route::segment::{classify_segment, RouterKind, Segment};
///
/// assert_eq!(classify_segment("[id]", RouterKind::App), Segment::Dynamic("id".into()));
/// assert_eq!(
///     classify_segment("[[...slug]]", RouterKind::App),
///     Segment::OptionalCatchAll("slug".into())
/// );
/// assert_eq!(classify_segment("(shop)", RouterKind::App), Segment::Group("shop".into()));
/// assert_eq!(classify_segment("(shop)", RouterKind::Pages), Segment::Static("(shop)".into()));
/// assert_eq!(classify_segment("%5Fsites", RouterKind::App), Segment::Static("_sites".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal segment, percent-decoded
    Static(String),
    /// `[name]`
    Dynamic(String),
    /// `[...name]`, one or more segments
    CatchAll(String),
    /// `[[...name]]`, zero or more segments
    OptionalCatchAll(String),
    /// `(name)`, contributes no URL segment
    Group(String),
    /// `@name`, a parallel slot
    Slot(String),
    /// `(.)name`, `(..)name`, `(..)(..)name`, `(...)name`
    Intercept(InterceptConvention, Box<Segment>),
    /// `_name`, excluded from routing with its whole subtree
    Private(String),
}

impl Segment {
    /// The URL template part this segment contributes, if any
    pub fn url_part(&self) -> Option<String> {
        match self {
            Segment::Static(name) => Some(name.clone()),
            Segment::Dynamic(name) => Some(format!(":{name}")),
            Segment::CatchAll(name) => Some(format!(":{name}+")),
            Segment::OptionalCatchAll(name) => Some(format!(":{name}*")),
            Segment::Group(_) | Segment::Slot(_) | Segment::Intercept(..) | Segment::Private(_) => {
                None
            }
        }
    }

    pub fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Dynamic(name) | Segment::CatchAll(name) | Segment::OptionalCatchAll(name) => {
                Some(name)
            }
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.param_name().is_some()
    }

    /// Groups are walked through as if absent.
    pub fn is_transparent(&self) -> bool {
        matches!(self, Segment::Group(_))
    }
}

/// Classifies one directory or file-stem name
///
/// # Parsing Rules (evaluated in order)
///
/// 1. `[[...name]]`, `[...name]`, `[name]`
/// 2. App only: `@name` slot, intercept prefixes, `(name)` group, `_name`
///    private folder
/// 3. Anything else is static, percent-decoded (`%5Fsites` → `_sites`)
pub fn classify_segment(name: &str, kind: RouterKind) -> Segment {
    if let Some(segment) = classify_bracket(name) {
        return segment;
    }

    if kind == RouterKind::App {
        if let Some(slot) = name.strip_prefix('@').filter(|s| !s.is_empty()) {
            return Segment::Slot(slot.to_string());
        }
        if let Some((convention, rest)) = InterceptConvention::parse_prefix(name) {
            return Segment::Intercept(convention, Box::new(classify_segment(rest, kind)));
        }
        if let Some(group) = name
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .filter(|s| !s.is_empty())
        {
            return Segment::Group(group.to_string());
        }
        if let Some(private) = name.strip_prefix('_') {
            return Segment::Private(private.to_string());
        }
    }

    Segment::Static(decode_static(name))
}

fn classify_bracket(name: &str) -> Option<Segment> {
    if let Some(inner) = name.strip_prefix("[[...").and_then(|s| s.strip_suffix("]]")) {
        return non_empty(inner).map(Segment::OptionalCatchAll);
    }
    if let Some(inner) = name.strip_prefix("[...").and_then(|s| s.strip_suffix(']')) {
        return non_empty(inner).map(Segment::CatchAll);
    }
    let inner = name.strip_prefix('[').and_then(|s| s.strip_suffix(']'))?;
    non_empty(inner).map(Segment::Dynamic)
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty() && !name.contains(['[', ']'])).then(|| name.to_string())
}

fn decode_static(name: &str) -> String {
    if !name.contains('%') {
        return name.to_string();
    }
    urlencoding::decode(name)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| name.to_string())
}

/// Joins URL template parts into a route pattern (`[]` → `/`)
pub fn join_pattern<S: AsRef<str>>(parts: &[S]) -> String {
    if parts.is_empty() {
        return "/".to_string();
    }
    parts.iter().fold(String::new(), |mut pattern, part| {
        pattern.push('/');
        pattern.push_str(part.as_ref());
        pattern
    })
}

/// Parameter names of a route pattern, left to right
///
/// ```
/// use vinext_router::route::segment::pattern_params;
///
/// assert_eq!(pattern_params("/shop/:category/:rest*"), vec!["category", "rest"]);
/// ```
pub fn pattern_params(pattern: &str) -> Vec<String> {
    pattern
        .split('/')
        .filter_map(|part| part.strip_prefix(':'))
        .map(|name| name.trim_end_matches(['+', '*']).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("about", Segment::Static("about".into()))]
    #[case("[id]", Segment::Dynamic("id".into()))]
    #[case("[team-slug]", Segment::Dynamic("team-slug".into()))]
    #[case("[...slug]", Segment::CatchAll("slug".into()))]
    #[case("[[...path]]", Segment::OptionalCatchAll("path".into()))]
    #[case("(marketing)", Segment::Group("marketing".into()))]
    #[case("@analytics", Segment::Slot("analytics".into()))]
    #[case("_components", Segment::Private("components".into()))]
    #[case("%5Fsites", Segment::Static("_sites".into()))]
    #[case("caf%C3%A9", Segment::Static("café".into()))]
    #[case("[]", Segment::Static("[]".into()))]
    fn test_classify_app(#[case] name: &str, #[case] expected: Segment) {
        assert_eq!(classify_segment(name, RouterKind::App), expected);
    }

    #[test]
    fn test_classify_intercept_wraps_inner_segment() {
        assert_eq!(
            classify_segment("(..)[id]", RouterKind::App),
            Segment::Intercept(
                InterceptConvention::OneLevelUp,
                Box::new(Segment::Dynamic("id".into()))
            )
        );
    }

    #[test]
    fn test_pages_has_no_app_conventions() {
        assert_eq!(classify_segment("_app", RouterKind::Pages), Segment::Static("_app".into()));
        assert_eq!(classify_segment("@x", RouterKind::Pages), Segment::Static("@x".into()));
    }

    #[test]
    fn test_url_parts() {
        assert_eq!(Segment::Dynamic("id".into()).url_part().as_deref(), Some(":id"));
        assert_eq!(Segment::CatchAll("s".into()).url_part().as_deref(), Some(":s+"));
        assert_eq!(Segment::OptionalCatchAll("s".into()).url_part().as_deref(), Some(":s*"));
        assert_eq!(Segment::Group("g".into()).url_part(), None);
    }

    #[test]
    fn test_join_pattern() {
        assert_eq!(join_pattern::<&str>(&[]), "/");
        assert_eq!(join_pattern(&["blog", ":slug"]), "/blog/:slug");
    }
}
