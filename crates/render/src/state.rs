//! Per-render state threaded through a single template render call.
//!
//! Some reference renderers keep this as thread-local state living on a
//! long-lived renderer object, reset at the start of every render and
//! read back out at the end. Since a `minijinja::Environment` here is
//! built once and reused across calls (for compiled-template caching),
//! the equivalent state instead lives in an `Arc<Mutex<RenderState>>`
//! created fresh for each render and captured by that render's filter
//! closures — nothing here is shared across concurrent renders.

use std::sync::{Arc, Mutex};

use sqlkit_core::{BoundParams, ParamStyle, ParamValue};

pub struct RenderState {
    pub dialect: ParamStyle,
    pub quote_char: char,
    pub bound: BoundParams,
}

impl RenderState {
    pub fn new(dialect: ParamStyle, quote_char: char) -> Self {
        RenderState {
            dialect,
            quote_char,
            bound: BoundParams::new(),
        }
    }

    /// Bind one value, returning the placeholder text to splice in.
    pub fn bind_one(&mut self, name: &str, value: ParamValue) -> String {
        let position = self.bound.push(name, value);
        self.dialect.placeholder(position, name)
    }
}

pub type SharedRenderState = Arc<Mutex<RenderState>>;

pub fn new_shared(dialect: ParamStyle, quote_char: char) -> SharedRenderState {
    Arc::new(Mutex::new(RenderState::new(dialect, quote_char)))
}
