//! The query orchestrator: binds the renderer, the query cache, the
//! mapping compiler, and a cursor into the
//! `execute`/`executemany`/`all`/`iter`/`one`/`scalar`/`rowcount`/
//! `return_as` surface.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use compact_str::CompactString;
use minijinja::value::{Value, ValueKind};

use sqlkit_core::{BoundParams, DriverError, FinalParams, ParamStyle, ParamValue, SqlkitError, UsageError};
use sqlkit_mapper::{
    compile, CacheKey, Hydrator, HydrationOutput, MapperCache, MappingPlan, RelationshipBinding, ResultShape,
    ShapeBinding,
};
use sqlkit_render::{render_template, CachedQuery, QueryKind};

use crate::driver::{Connection, Cursor, Pool};
use crate::scope;

const DEFAULT_BATCH: usize = 500;

fn driver_err<E>(e: E) -> SqlkitError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlkitError::Driver(DriverError(e))
}

/// A query's template, bound to a cached source: a `.sql` source
/// executes unchanged, a `.sql.tmpl` source is rendered on every call.
pub struct QueryTemplate {
    cached: Arc<CachedQuery>,
    quote_char: char,
}

impl QueryTemplate {
    pub fn new(cached: Arc<CachedQuery>, quote_char: char) -> Self {
        QueryTemplate { cached, quote_char }
    }

    fn render_dynamic(&self, ctx: Value, dialect: ParamStyle) -> Result<(String, BoundParams), sqlkit_core::TemplateError> {
        let rendered = render_template(&self.cached.name, &self.cached.source, ctx, dialect, self.quote_char)?;
        Ok((rendered.sql, rendered.bound))
    }
}

/// What a call site supplies to drive one query call: a template context
/// for a dynamic (`.sql.tmpl`) query, rendered and auto-bound per call,
/// or a driver-native params collection for a static (`.sql`) query,
/// forwarded to the cursor unchanged since there is no template to bind
/// values into.
pub enum QueryArgs {
    Context(Value),
    Params(FinalParams),
}

impl From<Value> for QueryArgs {
    fn from(ctx: Value) -> Self {
        QueryArgs::Context(ctx)
    }
}

impl From<FinalParams> for QueryArgs {
    fn from(params: FinalParams) -> Self {
        QueryArgs::Params(params)
    }
}

/// A minijinja context carrying no entries, e.g. `context! {}` or the
/// default `Value`, used against a static query exactly as `None` would
/// forward zero params to the cursor.
fn is_empty_context(ctx: &Value) -> bool {
    match ctx.kind() {
        ValueKind::Undefined | ValueKind::None => true,
        ValueKind::Map | ValueKind::Seq => matches!(ctx.len(), Some(0)),
        _ => false,
    }
}

/// Either a cursor the caller already holds, or one the orchestrator
/// acquired from the scoped connection and owns for the call's duration.
pub enum CursorHandle<'c, Cur> {
    Borrowed(&'c mut Cur),
    Owned(Cur),
}

impl<'c, Cur> std::ops::Deref for CursorHandle<'c, Cur> {
    type Target = Cur;
    fn deref(&self) -> &Cur {
        match self {
            CursorHandle::Borrowed(c) => c,
            CursorHandle::Owned(c) => c,
        }
    }
}

impl<'c, Cur> std::ops::DerefMut for CursorHandle<'c, Cur> {
    fn deref_mut(&mut self) -> &mut Cur {
        match self {
            CursorHandle::Borrowed(c) => c,
            CursorHandle::Owned(c) => c,
        }
    }
}

type CurOf<P> = <<P as Pool>::Connection as Connection>::Cursor;
type ErrOf<P> = <<P as Pool>::Connection as Connection>::Error;

fn resolve_cursor<'c, P>(
    cursor: Option<&'c mut CurOf<P>>,
) -> Result<CursorHandle<'c, CurOf<P>>, SqlkitError<ErrOf<P>>>
where
    P: Pool,
    P::Connection: 'static,
{
    match cursor {
        Some(c) => Ok(CursorHandle::Borrowed(c)),
        None => {
            let cur = scope::with_current::<P, _>(|conn| conn.cursor())
                .map_err(SqlkitError::Usage)?
                .map_err(driver_err)?;
            Ok(CursorHandle::Owned(cur))
        }
    }
}

/// A lazily-fetched row stream: pulls from the cursor in batches instead
/// of buffering the whole result.
pub struct RowIter<'c, Cur> {
    cursor: CursorHandle<'c, Cur>,
    batch: VecDeque<Vec<ParamValue>>,
    batch_size: usize,
    exhausted: bool,
}

impl<'c, Cur: Cursor> Iterator for RowIter<'c, Cur> {
    type Item = Result<Vec<ParamValue>, Cur::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.batch.pop_front() {
            return Some(Ok(row));
        }
        if self.exhausted {
            return None;
        }
        match self.cursor.fetchmany(self.batch_size) {
            Ok(rows) if rows.is_empty() => {
                self.exhausted = true;
                None
            }
            Ok(rows) => {
                self.batch = rows.into();
                self.batch.pop_front().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

/// A raw query: renders a template, binds params, and drives a cursor
/// through the execute/fetch surface.
pub struct Query<P: Pool> {
    template: QueryTemplate,
    dialect: ParamStyle,
    batch_size: usize,
    _pool: PhantomData<P>,
}

impl<P> Query<P>
where
    P: Pool,
    P::Connection: 'static,
{
    pub fn new(template: QueryTemplate, dialect: ParamStyle) -> Self {
        Query {
            template,
            dialect,
            batch_size: DEFAULT_BATCH,
            _pool: PhantomData,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Resolve one call's args to the SQL text to execute and the
    /// driver-native params to execute it with: a dynamic query renders
    /// `args` as a template context; a static query forwards `args`'
    /// params straight through, unchanged, to the cursor. An empty
    /// context against a static query is accepted as "no params";
    /// anything else that doesn't match the query's own kind is a usage
    /// error rather than a silently-dropped argument.
    fn resolve(&self, args: QueryArgs) -> Result<(String, FinalParams), SqlkitError<ErrOf<P>>> {
        match (self.template.cached.kind, args) {
            (QueryKind::Static, QueryArgs::Params(params)) => Ok((self.template.cached.source.to_string(), params)),
            (QueryKind::Static, QueryArgs::Context(ctx)) if is_empty_context(&ctx) => {
                Ok((self.template.cached.source.to_string(), FinalParams::Positional(Vec::new())))
            }
            (QueryKind::Dynamic, QueryArgs::Context(ctx)) => {
                let (sql, bound) = self.template.render_dynamic(ctx, self.dialect)?;
                Ok((sql, bound.finish(self.dialect)))
            }
            _ => Err(SqlkitError::Usage(UsageError::ConflictingExecuteArgs)),
        }
    }

    /// Render (dynamic) or reuse (static) SQL, bind `args`, execute on a
    /// cursor, and return that cursor for downstream consumption.
    pub fn execute<'c>(
        &self,
        args: impl Into<QueryArgs>,
        cursor: Option<&'c mut CurOf<P>>,
    ) -> Result<CursorHandle<'c, CurOf<P>>, SqlkitError<ErrOf<P>>> {
        let (sql, final_params) = self.resolve(args.into())?;
        let mut handle = resolve_cursor::<P>(cursor)?;
        handle.execute(&sql, &final_params).map_err(driver_err)?;
        Ok(handle)
    }

    /// Resolve the same template once per args, then hand the whole
    /// batch to the driver's `executemany` — same SQL, iterating
    /// parameter sets. A dynamic template is expected to render to the
    /// same SQL text for every context in the batch.
    pub fn executemany<'c, I, A>(
        &self,
        batch: I,
        cursor: Option<&'c mut CurOf<P>>,
    ) -> Result<CursorHandle<'c, CurOf<P>>, SqlkitError<ErrOf<P>>>
    where
        I: IntoIterator<Item = A>,
        A: Into<QueryArgs>,
    {
        let mut sql = None;
        let mut batches = Vec::new();
        for args in batch {
            let (rendered_sql, final_params) = self.resolve(args.into())?;
            if sql.is_none() {
                sql = Some(rendered_sql);
            }
            batches.push(final_params);
        }
        let sql = sql.unwrap_or_default();
        let mut handle = resolve_cursor::<P>(cursor)?;
        handle.executemany(&sql, &batches).map_err(driver_err)?;
        Ok(handle)
    }

    pub fn all(
        &self,
        args: impl Into<QueryArgs>,
        cursor: Option<&mut CurOf<P>>,
    ) -> Result<Vec<Vec<ParamValue>>, SqlkitError<ErrOf<P>>> {
        let mut handle = self.execute(args, cursor)?;
        handle.fetchall().map_err(driver_err)
    }

    pub fn iter<'c>(
        &self,
        args: impl Into<QueryArgs>,
        batch_size: Option<usize>,
        cursor: Option<&'c mut CurOf<P>>,
    ) -> Result<RowIter<'c, CurOf<P>>, SqlkitError<ErrOf<P>>> {
        let handle = self.execute(args, cursor)?;
        Ok(RowIter {
            cursor: handle,
            batch: VecDeque::new(),
            batch_size: batch_size.unwrap_or(self.batch_size),
            exhausted: false,
        })
    }

    /// `raising` selects the non-default behavior: an empty result
    /// becomes `UsageError::EmptyResultRaising` instead of `Ok(None)`.
    pub fn one(
        &self,
        args: impl Into<QueryArgs>,
        raising: bool,
        cursor: Option<&mut CurOf<P>>,
    ) -> Result<Option<Vec<ParamValue>>, SqlkitError<ErrOf<P>>> {
        let mut handle = self.execute(args, cursor)?;
        let row = handle.fetchone().map_err(driver_err)?;
        if row.is_none() && raising {
            return Err(SqlkitError::Usage(UsageError::EmptyResultRaising));
        }
        Ok(row)
    }

    pub fn scalar(
        &self,
        args: impl Into<QueryArgs>,
        cursor: Option<&mut CurOf<P>>,
    ) -> Result<Option<ParamValue>, SqlkitError<ErrOf<P>>> {
        let row = self.one(args, false, cursor)?;
        Ok(row.and_then(|r| r.into_iter().next()))
    }

    pub fn rowcount(&self, args: impl Into<QueryArgs>, cursor: Option<&mut CurOf<P>>) -> Result<i64, SqlkitError<ErrOf<P>>> {
        let handle = self.execute(args, cursor)?;
        Ok(handle.rowcount())
    }

    /// Produce a [`MappedQuery`] whose `iter`/`all`/`one` route the row
    /// stream through a compiled hydrator.
    pub fn return_as(
        self,
        result: ResultShape,
        shapes: Vec<ShapeBinding>,
        relationships: Vec<RelationshipBinding>,
        mapper_cache: Arc<MapperCache>,
    ) -> MappedQuery<P> {
        MappedQuery {
            query: self,
            mapper_cache,
            result,
            shapes,
            relationships,
        }
    }
}

/// A query bound to a declared result shape, driving rows through a
/// compiled [`sqlkit_mapper::Hydrator`] instead of returning raw tuples.
pub struct MappedQuery<P: Pool> {
    query: Query<P>,
    mapper_cache: Arc<MapperCache>,
    result: ResultShape,
    shapes: Vec<ShapeBinding>,
    relationships: Vec<RelationshipBinding>,
}

impl<P> MappedQuery<P>
where
    P: Pool,
    P::Connection: 'static,
{
    fn compile_plan(&self, columns: &[CompactString]) -> Result<Arc<MappingPlan>, sqlkit_core::MappingSpecError> {
        let plain_relationships: Vec<_> = self.relationships.iter().map(|r| r.relationship.clone()).collect();
        let key = CacheKey::new(&self.shapes, &plain_relationships, columns);
        self.mapper_cache.get_or_compile(key, || {
            compile(
                self.result.clone(),
                self.shapes.clone(),
                self.relationships.clone(),
                columns,
            )
        })
    }

    pub fn all(
        &self,
        args: impl Into<QueryArgs>,
        cursor: Option<&mut CurOf<P>>,
    ) -> Result<Vec<HydrationOutput>, SqlkitError<ErrOf<P>>> {
        let mut handle = self.query.execute(args, cursor)?;
        let columns = handle.column_names();
        let plan = self.compile_plan(&columns)?;
        let rows = handle.fetchall().map_err(driver_err)?;

        let mut hydrator = Hydrator::new(plan);
        let mut out = Vec::new();
        for row in &rows {
            if let Some(h) = hydrator.feed_row(row).map_err(SqlkitError::MappingSpec)? {
                out.push(h);
            }
        }
        if let Some(h) = hydrator.finish() {
            out.push(h);
        }
        Ok(out)
    }

    pub fn one(
        &self,
        args: impl Into<QueryArgs>,
        cursor: Option<&mut CurOf<P>>,
    ) -> Result<Option<HydrationOutput>, SqlkitError<ErrOf<P>>> {
        Ok(self.all(args, cursor)?.into_iter().next())
    }

    pub fn iter<'c>(
        &self,
        args: impl Into<QueryArgs>,
        batch_size: Option<usize>,
        cursor: Option<&'c mut CurOf<P>>,
    ) -> Result<MappedIter<'c, CurOf<P>>, SqlkitError<ErrOf<P>>> {
        let mut handle = self.query.execute(args, cursor)?;
        let columns = handle.column_names();
        let plan = self.compile_plan(&columns)?;
        let batch_size = batch_size.unwrap_or(self.query.batch_size);
        Ok(MappedIter {
            rows: RowIter {
                cursor: handle,
                batch: VecDeque::new(),
                batch_size,
                exhausted: false,
            },
            hydrator: Hydrator::new(plan),
            pending_final: None,
            finished: false,
        })
    }
}

/// Adapts a [`RowIter`] into a [`HydrationOutput`] stream. On
/// exhaustion it yields the trailing root and closes the cursor
/// explicitly rather than relying on `Drop`.
pub struct MappedIter<'c, Cur> {
    rows: RowIter<'c, Cur>,
    hydrator: Hydrator,
    pending_final: Option<HydrationOutput>,
    finished: bool,
}

impl<'c, Cur: Cursor> Iterator for MappedIter<'c, Cur> {
    type Item = Result<HydrationOutput, SqlkitError<Cur::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(out) = self.pending_final.take() {
            return Some(Ok(out));
        }
        if self.finished {
            return None;
        }
        loop {
            match self.rows.next() {
                Some(Ok(row)) => match self.hydrator.feed_row(&row) {
                    Ok(Some(out)) => return Some(Ok(out)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(SqlkitError::MappingSpec(e)));
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    if let Err(close_err) = self.rows.cursor.close() {
                        log::warn!("failed to close cursor after driver error: {close_err}");
                    }
                    return Some(Err(driver_err(e)));
                }
                None => {
                    self.finished = true;
                    if let Err(close_err) = self.rows.cursor.close() {
                        log::warn!("failed to close cursor after exhausting rows: {close_err}");
                    }
                    return self.hydrator.finish().map(Ok);
                }
            }
        }
    }
}
