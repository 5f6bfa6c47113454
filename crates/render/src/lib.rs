//! Jinja-style SQL templating: lexical automatic parameter binding
//! ([`autobind`]), the `bind`/`inclause`/`identifier`/`sqlsafe` filters
//! ([`filters`]), a single render call ([`renderer::render_template`]),
//! and the static/dynamic query source cache ([`cache::QueryCache`]).

pub mod autobind;
pub mod cache;
pub mod filters;
pub mod renderer;
pub mod state;

pub use autobind::auto_bind;
pub use cache::{CachedQuery, QueryCache, QueryKind};
pub use renderer::{render_template, Rendered};
