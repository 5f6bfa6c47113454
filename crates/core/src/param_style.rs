use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use crate::error::ConfigError;

/// A driver's declared placeholder dialect.
///
/// Mirrors the six styles the Python DB-API world settled on.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamStyle {
    /// `?`
    Qmark,
    /// `:1`, `:2`, ... (1-based)
    Numeric,
    /// `:name`
    Named,
    /// `%s`
    Format,
    /// `%(name)s`
    PyFormat,
    /// `$1`, `$2`, ... (1-based)
    Dollar,
}

impl ParamStyle {
    /// Whether the final bound-parameter collection for this style is a
    /// positional sequence (`true`) or a named mapping (`false`).
    pub fn is_positional(self) -> bool {
        matches!(
            self,
            ParamStyle::Qmark | ParamStyle::Numeric | ParamStyle::Format | ParamStyle::Dollar
        )
    }

    pub fn placeholder(self, index: usize, name: &str) -> String {
        match self {
            ParamStyle::Qmark => "?".to_string(),
            ParamStyle::Format => "%s".to_string(),
            ParamStyle::Numeric => format!(":{index}"),
            ParamStyle::Dollar => format!("${index}"),
            ParamStyle::Named => format!(":{name}"),
            ParamStyle::PyFormat => format!("%({name})s"),
        }
    }
}

impl fmt::Display for ParamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamStyle::Qmark => "qmark",
            ParamStyle::Numeric => "numeric",
            ParamStyle::Named => "named",
            ParamStyle::Format => "format",
            ParamStyle::PyFormat => "pyformat",
            ParamStyle::Dollar => "dollar",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ParamStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qmark" => Ok(ParamStyle::Qmark),
            "numeric" => Ok(ParamStyle::Numeric),
            "named" => Ok(ParamStyle::Named),
            "format" => Ok(ParamStyle::Format),
            "pyformat" => Ok(ParamStyle::PyFormat),
            "dollar" => Ok(ParamStyle::Dollar),
            other => Err(ConfigError::UnknownParamStyle(other.to_string())),
        }
    }
}

/// Something that can report the dotted module/crate path a driver
/// connection or cursor "lives under", for [`recognize`] to walk.
///
/// Implemented by a driver adapter (outside this crate's scope):
/// e.g. a `rusqlite` adapter would return `"rusqlite"`, an
/// adapter layered over several modules could return
/// `"myapp::drivers::postgres::conn"` and each dotted segment is tried in
/// turn, innermost first.
pub trait ParamStyleSource {
    /// The dotted path to walk looking for a declared style.
    fn module_path(&self) -> &str;

    /// The declared style, if this exact path segment declares one.
    ///
    /// A real adapter usually only has one segment with a declared style
    /// (its own crate root); this is called once per segment as
    /// [`recognize`] walks upward.
    fn declared_style(&self, path_segment: &str) -> Option<ParamStyle>;
}

static STYLE_CACHE: OnceLock<RwLock<HashMap<TypeId, ParamStyle>>> = OnceLock::new();

/// Discover a driver's placeholder dialect, caching the result per
/// connection/cursor type: the first discovery for a given type is
/// cached for every later call.
pub fn recognize<T: ParamStyleSource + 'static>(source: &T) -> Result<ParamStyle, ConfigError> {
    let cache = STYLE_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();

    if let Some(style) = cache.read().unwrap().get(&key) {
        return Ok(*style);
    }

    let mut module_path = source.module_path();
    loop {
        if let Some(style) = source.declared_style(module_path) {
            cache.write().unwrap().insert(key, style);
            return Ok(style);
        }
        match module_path.rsplit_once("::") {
            Some((rest, _)) if !rest.is_empty() => module_path = rest,
            _ => break,
        }
    }

    Err(ConfigError::ParamStyleDiscoveryFailed {
        module_path: source.module_path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        for style in [
            ParamStyle::Qmark,
            ParamStyle::Numeric,
            ParamStyle::Named,
            ParamStyle::Format,
            ParamStyle::PyFormat,
            ParamStyle::Dollar,
        ] {
            let parsed: ParamStyle = style.to_string().parse().unwrap();
            assert_eq!(parsed, style);
        }
    }

    #[test]
    fn unknown_style_is_a_config_error() {
        let err = "made-up".parse::<ParamStyle>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParamStyle(_)));
    }

    #[test]
    fn positional_vs_named_classification() {
        assert!(ParamStyle::Qmark.is_positional());
        assert!(ParamStyle::Numeric.is_positional());
        assert!(ParamStyle::Format.is_positional());
        assert!(ParamStyle::Dollar.is_positional());
        assert!(!ParamStyle::Named.is_positional());
        assert!(!ParamStyle::PyFormat.is_positional());
    }

    struct Fake(&'static str, ParamStyle);

    impl ParamStyleSource for Fake {
        fn module_path(&self) -> &str {
            self.0
        }

        fn declared_style(&self, path_segment: &str) -> Option<ParamStyle> {
            (path_segment == self.0).then_some(self.1)
        }
    }

    #[test]
    fn discovery_walks_up_dotted_segments() {
        struct Nested;
        impl ParamStyleSource for Nested {
            fn module_path(&self) -> &str {
                "myapp::drivers::postgres::conn"
            }

            fn declared_style(&self, path_segment: &str) -> Option<ParamStyle> {
                (path_segment == "myapp::drivers::postgres").then_some(ParamStyle::Dollar)
            }
        }
        assert_eq!(recognize(&Nested).unwrap(), ParamStyle::Dollar);
    }

    #[test]
    fn discovery_is_cached_per_type() {
        let fake = Fake("rusqlite", ParamStyle::Qmark);
        assert_eq!(recognize(&fake).unwrap(), ParamStyle::Qmark);
        // Second call hits the cache even though `declared_style` would
        // still answer correctly; this just proves no panic/deadlock on
        // repeat lookups from the same type.
        assert_eq!(recognize(&fake).unwrap(), ParamStyle::Qmark);
    }

    #[test]
    fn discovery_failure_is_fatal_config_error() {
        struct NoStyle;
        impl ParamStyleSource for NoStyle {
            fn module_path(&self) -> &str {
                "nowhere"
            }
            fn declared_style(&self, _: &str) -> Option<ParamStyle> {
                None
            }
        }
        let err = recognize(&NoStyle).unwrap_err();
        assert!(matches!(err, ConfigError::ParamStyleDiscoveryFailed { .. }));
    }
}
