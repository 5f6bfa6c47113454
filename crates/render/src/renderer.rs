//! Render a single template source into SQL text plus its bound
//! parameters: auto-bind the source, render it against the call's
//! context, and collect whatever the filters bound along the way.

use std::sync::Arc;
use std::time::Instant;

use minijinja::value::Value;
use minijinja::Environment;

use sqlkit_core::{BoundParams, ParamStyle, TemplateError};

use crate::autobind::auto_bind;
use crate::filters;
use crate::state;

pub struct Rendered {
    pub sql: String,
    pub bound: BoundParams,
}

/// Render `source` (raw, not yet auto-bound) named `name` against `ctx`,
/// binding values using `dialect`'s placeholder syntax and `quote_char`
/// for the `identifier` filter.
///
/// A fresh `minijinja::Environment` is built for each call so that the
/// filter closures can close over this render's own
/// [`state::SharedRenderState`] without leaking it into any other
/// concurrent render.
pub fn render_template(
    name: &str,
    source: &str,
    ctx: Value,
    dialect: ParamStyle,
    quote_char: char,
) -> Result<Rendered, TemplateError> {
    let started = Instant::now();
    log::trace!("render start for template {name:?}");

    let processed = auto_bind(source);
    let shared = state::new_shared(dialect, quote_char);

    let mut env = Environment::new();
    filters::install(&mut env, shared.clone());
    env.add_template_owned(name.to_string(), processed)
        .map_err(|e| TemplateError::Load {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    let sql = {
        let tmpl = env.get_template(name).map_err(|e| TemplateError::Load {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        tmpl.render(ctx).map_err(|e| filter_template_error(name, &e))?
    };
    drop(env);

    let state = Arc::try_unwrap(shared)
        .unwrap_or_else(|_| unreachable!("no filter closures should outlive the render call"))
        .into_inner()
        .expect("render state mutex is never poisoned: filters never panic mid-lock");

    log::debug!("render end for template {name:?}, elapsed {:?}", started.elapsed());

    Ok(Rendered {
        sql,
        bound: state.bound,
    })
}

/// Map a template-render failure to the dedicated [`TemplateError`]
/// variant for a filter's own non-iterable/non-string rejection, falling
/// back to the generic [`TemplateError::Render`] for anything else.
fn filter_template_error(name: &str, err: &minijinja::Error) -> TemplateError {
    let detail = err.to_string();
    if detail.contains(filters::INCLAUSE_NOT_ITERABLE_MSG) {
        TemplateError::InclauseNotIterable
    } else if detail.contains(filters::IDENTIFIER_NOT_STRING_OR_ITERABLE_MSG) {
        TemplateError::IdentifierNotStringOrIterable
    } else {
        TemplateError::Render {
            name: name.to_string(),
            message: detail,
        }
    }
}
