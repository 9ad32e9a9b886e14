/// Interception convention of an intercepting route directory
///
/// Levels count URL segments, not filesystem directories: groups and slots
/// between the intercept and its target do not count.
///
/// # Examples
///
/// ```
/// use vinext_router::app::InterceptConvention;
///
/// // app/feed/(.)photo/[id]/page.tsx → intercepts /feed/photo/:id
/// assert_eq!(
///     InterceptConvention::parse_prefix("(.)photo"),
///     Some((InterceptConvention::SameLevel, "photo"))
/// );
///
/// // app/shop/cart/(..)(..)login/page.tsx → intercepts /login
/// assert_eq!(
///     InterceptConvention::parse_prefix("(..)(..)login"),
///     Some((InterceptConvention::TwoLevelsUp, "login"))
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptConvention {
    /// `(.)` - segments at the same level
    SameLevel,
    /// `(..)` - segments one level up
    OneLevelUp,
    /// `(..)(..)` - segments two levels up
    TwoLevelsUp,
    /// `(...)` - segments from the app root
    FromRoot,
}

impl InterceptConvention {
    // Longest prefix first: `(..)(..)` must win over `(..)`.
    const PREFIXES: [(&'static str, InterceptConvention); 4] = [
        ("(..)(..)", InterceptConvention::TwoLevelsUp),
        ("(...)", InterceptConvention::FromRoot),
        ("(..)", InterceptConvention::OneLevelUp),
        ("(.)", InterceptConvention::SameLevel),
    ];

    /// Splits an intercept directory name into its convention and the
    /// remaining segment name
    pub fn parse_prefix(name: &str) -> Option<(Self, &str)> {
        Self::PREFIXES.iter().find_map(|(prefix, convention)| {
            name.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (*convention, rest))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterceptConvention::SameLevel => ".",
            InterceptConvention::OneLevelUp => "..",
            InterceptConvention::TwoLevelsUp => "(..)(..)",
            InterceptConvention::FromRoot => "...",
        }
    }

    /// URL parts the intercepted target starts from, given the URL parts of
    /// the directory that holds the intercept
    pub fn resolve_base<'a>(&self, url: &'a [String]) -> &'a [String] {
        let keep = match self {
            InterceptConvention::SameLevel => url.len(),
            InterceptConvention::OneLevelUp => url.len().saturating_sub(1),
            InterceptConvention::TwoLevelsUp => url.len().saturating_sub(2),
            InterceptConvention::FromRoot => 0,
        };
        &url[..keep]
    }
}

impl std::fmt::Display for InterceptConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
